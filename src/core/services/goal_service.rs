use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    core::unit_of_work::{Abort, UnitOfWork},
    domain::{Amount, Goal, ReservedCategories},
    errors::{LedgerError, Result, ValidationError},
    storage::{to_record, Direction, Query, RecordStore, StoreResult, Table},
};

use super::{load, load_all, AccountService, Transfer, TransferService};

const ENTITY: &str = "goal";

/// Result of [`GoalService::contribute`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionOutcome {
    pub goal: Goal,
    /// Mirrored account movement, absent for abstract goals.
    pub transfer: Option<Transfer>,
}

pub struct GoalService<'a> {
    store: &'a dyn RecordStore,
    transfers: TransferService<'a>,
}

impl<'a> GoalService<'a> {
    pub fn new(store: &'a dyn RecordStore, reserved: ReservedCategories) -> Self {
        Self {
            store,
            transfers: TransferService::new(store, reserved),
        }
    }

    pub fn create(&self, goal: Goal) -> Result<Goal> {
        if goal.current_amount < Decimal::ZERO {
            return Err(ValidationError::Invalid(format!(
                "goal `{}` cannot start below zero",
                goal.name
            ))
            .into());
        }
        if let Some(account_id) = goal.related_account_id {
            AccountService::new(self.store).ensure_exists(account_id)?;
        }
        self.store.insert(Table::Goals, to_record(&goal)?)?;
        info!(goal_id = %goal.id, name = %goal.name, target = %goal.target_amount, "goal created");
        Ok(goal)
    }

    pub fn get(&self, id: Uuid) -> Result<Goal> {
        load(self.store, Table::Goals, ENTITY, id).map(|(_, goal)| goal)
    }

    pub fn list(&self) -> Result<Vec<Goal>> {
        load_all(
            self.store,
            Table::Goals,
            &Query::new().order_by("name", Direction::Ascending),
        )
    }

    /// Adds `amount` to the goal. With both a source account and a related
    /// account the money also moves between them as a transfer.
    #[instrument(skip(self, goal), fields(goal_id = %goal.id))]
    pub fn contribute(
        &self,
        goal: &Goal,
        amount: Decimal,
        date: NaiveDate,
        source_account: Option<Uuid>,
    ) -> Result<ContributionOutcome> {
        let amount = Amount::new(amount)?;
        let (previous, current): (_, Goal) = load(self.store, Table::Goals, ENTITY, goal.id)?;
        let transfer = match (source_account, current.related_account_id) {
            (Some(source), Some(related)) => Some(self.transfers.prepare(
                source,
                related,
                amount,
                date,
                &format!("Contribution to {}", current.name),
            )?),
            _ => None,
        };
        let updated = current.with_contribution(amount);

        let mut uow = UnitOfWork::begin(self.store);
        let written = (|| -> StoreResult<()> {
            if let Some(transfer) = &transfer {
                self.transfers.stage(&mut uow, transfer)?;
            }
            uow.update(Table::Goals, current.id, to_record(&updated)?, previous)?;
            Ok(())
        })();
        if let Err(err) = written {
            return Err(match uow.abort(err) {
                Abort::RolledBack(cause) => cause.into(),
                Abort::Stranded { cause, stranded } => {
                    warn!(stranded = stranded.len(), "contribution left writes behind");
                    LedgerError::PartialContributionFailure {
                        goal_id: current.id,
                        stranded,
                        reason: cause.to_string(),
                    }
                }
            });
        }
        uow.commit();
        if updated.is_reached() && !current.is_reached() {
            info!(current = %updated.current_amount, "goal reached");
        }
        info!(current = %updated.current_amount, mirrored = transfer.is_some(), "contribution recorded");
        Ok(ContributionOutcome {
            goal: updated,
            transfer,
        })
    }
}
