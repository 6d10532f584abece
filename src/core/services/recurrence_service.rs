//! Keeps fixed-expense schedules current and records their payments.

use chrono::{Duration, NaiveDate};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    core::unit_of_work::{Abort, UnitOfWork},
    domain::{ScheduledFixedExpense, Transaction},
    errors::{LedgerError, Result, ValidationError},
    ledger::schedule,
    storage::{to_record, Direction, Filter, Query, RecordStore, StoreResult, Table},
};

use super::{load, load_all, AccountService};

const ENTITY: &str = "fixed expense";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleAdvance {
    pub id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug)]
pub struct ScheduleFailure {
    pub id: Uuid,
    pub error: LedgerError,
}

/// Outcome of [`RecurrenceService::catch_up_all`]. Schedules already current
/// appear in neither list.
#[derive(Debug, Default)]
pub struct CatchUpReport {
    pub advanced: Vec<ScheduleAdvance>,
    pub failed: Vec<ScheduleFailure>,
}

impl CatchUpReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of [`RecurrenceService::pay`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulePayment {
    pub schedule: ScheduledFixedExpense,
    pub entry: Transaction,
}

pub struct RecurrenceService<'a> {
    store: &'a dyn RecordStore,
    advance_limit: usize,
}

impl<'a> RecurrenceService<'a> {
    pub fn new(store: &'a dyn RecordStore, advance_limit: usize) -> Self {
        Self {
            store,
            advance_limit,
        }
    }

    pub fn create(&self, schedule: ScheduledFixedExpense) -> Result<ScheduledFixedExpense> {
        schedule.validate()?;
        self.store
            .insert(Table::FixedExpenses, to_record(&schedule)?)?;
        info!(
            schedule_id = %schedule.id,
            frequency = %schedule.frequency,
            next_due = %schedule.next_due_date,
            "fixed expense scheduled"
        );
        Ok(schedule)
    }

    pub fn get(&self, id: Uuid) -> Result<ScheduledFixedExpense> {
        load(self.store, Table::FixedExpenses, ENTITY, id).map(|(_, schedule)| schedule)
    }

    pub fn list(&self) -> Result<Vec<ScheduledFixedExpense>> {
        load_all(
            self.store,
            Table::FixedExpenses,
            &Query::new().order_by("next_due_date", Direction::Ascending),
        )
    }

    pub fn set_active(&self, id: Uuid, active: bool) -> Result<ScheduledFixedExpense> {
        let (_, mut schedule): (_, ScheduledFixedExpense) =
            load(self.store, Table::FixedExpenses, ENTITY, id)?;
        schedule.is_active = active;
        self.store.update(
            Table::FixedExpenses,
            id,
            serde_json::json!({ "is_active": active }),
        )?;
        Ok(schedule)
    }

    /// Moves every stale active schedule forward to `today` or later.
    ///
    /// `Once` schedules have nothing to advance and are skipped. A schedule
    /// that cannot be advanced is reported and the batch continues.
    #[instrument(skip(self))]
    pub fn catch_up_all(&self, today: NaiveDate) -> Result<CatchUpReport> {
        let stale: Vec<ScheduledFixedExpense> = load_all(
            self.store,
            Table::FixedExpenses,
            &Query::new()
                .filter(Filter::eq("is_active", true))
                .filter(Filter::lt("next_due_date", today.to_string())),
        )?;

        let mut report = CatchUpReport::default();
        for schedule in stale.iter().filter(|s| s.frequency.is_recurring()) {
            match self.catch_up_one(schedule, today) {
                Ok(to) => report.advanced.push(ScheduleAdvance {
                    id: schedule.id,
                    from: schedule.next_due_date,
                    to,
                }),
                Err(error) => {
                    warn!(schedule_id = %schedule.id, %error, "schedule could not be advanced");
                    report.failed.push(ScheduleFailure {
                        id: schedule.id,
                        error,
                    });
                }
            }
        }
        info!(
            advanced = report.advanced.len(),
            failed = report.failed.len(),
            "schedules caught up"
        );
        Ok(report)
    }

    /// Active schedules with reminders enabled that fall due within
    /// `within_days` of `today`, inclusive.
    pub fn upcoming(&self, today: NaiveDate, within_days: u32) -> Result<Vec<ScheduledFixedExpense>> {
        let horizon = today
            .checked_add_signed(Duration::days(i64::from(within_days)))
            .unwrap_or(NaiveDate::MAX);
        let due: Vec<ScheduledFixedExpense> = load_all(
            self.store,
            Table::FixedExpenses,
            &Query::new()
                .filter(Filter::eq("is_active", true))
                .filter(Filter::eq("notification_enabled", true))
                .order_by("next_due_date", Direction::Ascending),
        )?;
        Ok(due
            .into_iter()
            .filter(|s| s.next_due_date >= today && s.next_due_date <= horizon)
            .collect())
    }

    /// Due dates of one schedule from its next due date through `until`,
    /// capped at the advance limit. Inactive schedules have none.
    pub fn due_dates(&self, schedule_id: Uuid, until: NaiveDate) -> Result<Vec<NaiveDate>> {
        let schedule = self.get(schedule_id)?;
        if !schedule.is_active {
            return Ok(Vec::new());
        }
        Ok(schedule::occurrences_until(
            schedule.next_due_date,
            schedule.frequency,
            schedule.anchor_day,
            until,
            self.advance_limit,
        ))
    }

    /// Records the expense for the current occurrence and moves the schedule
    /// one period forward. A `Once` schedule is deactivated instead.
    #[instrument(skip(self))]
    pub fn pay(&self, schedule_id: Uuid, account_id: Uuid, date: NaiveDate) -> Result<SchedulePayment> {
        let (previous, schedule): (_, ScheduledFixedExpense) =
            load(self.store, Table::FixedExpenses, ENTITY, schedule_id)?;
        if !schedule.is_active {
            return Err(ValidationError::Invalid(format!(
                "fixed expense {schedule_id} is inactive"
            ))
            .into());
        }
        AccountService::new(self.store).ensure_exists(account_id)?;

        let entry = Transaction::expense(account_id, schedule.amount, date, &schedule.description)
            .with_category(schedule.category_id);
        let mut updated = schedule.clone();
        if schedule.frequency.is_recurring() {
            updated.next_due_date =
                schedule::advance(schedule.next_due_date, schedule.frequency, schedule.anchor_day);
        } else {
            updated.is_active = false;
        }

        let mut uow = UnitOfWork::begin(self.store);
        let written = (|| -> StoreResult<()> {
            uow.insert(Table::Transactions, to_record(&entry)?)?;
            uow.update(Table::FixedExpenses, schedule_id, to_record(&updated)?, previous)?;
            Ok(())
        })();
        if let Err(err) = written {
            return Err(match uow.abort(err) {
                Abort::RolledBack(cause) => cause.into(),
                Abort::Stranded { cause, .. } => LedgerError::PartialPaymentFailure {
                    entry_id: entry.id,
                    target_id: schedule_id,
                    reason: cause.to_string(),
                },
            });
        }
        uow.commit();
        info!(next_due = %updated.next_due_date, active = updated.is_active, "fixed expense paid");
        Ok(SchedulePayment {
            schedule: updated,
            entry,
        })
    }

    fn catch_up_one(&self, schedule: &ScheduledFixedExpense, today: NaiveDate) -> Result<NaiveDate> {
        let next = schedule::catch_up(
            schedule.next_due_date,
            schedule.frequency,
            schedule.anchor_day,
            today,
            self.advance_limit,
        )?;
        self.store.update(
            Table::FixedExpenses,
            schedule.id,
            serde_json::json!({ "next_due_date": next }),
        )?;
        Ok(next)
    }
}
