//! Debt and loan bookkeeping.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    core::unit_of_work::{Abort, UnitOfWork},
    domain::{Amount, Obligation, ObligationKind, ObligationTerms, Transaction},
    errors::{LedgerError, Result},
    storage::{to_record, Direction, Query, RecordStore, StoreResult, Table},
};

use super::{load, load_all, AccountService};

/// Result of [`ObligationService::record_payment`].
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub obligation: Obligation,
    /// Ledger entry created for the payment.
    pub entry: Transaction,
    /// Portion of the payment above the outstanding balance. Not recorded
    /// anywhere else.
    pub overpayment: Decimal,
}

pub struct ObligationService<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> ObligationService<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    pub fn create(&self, obligation: Obligation) -> Result<Obligation> {
        obligation.validate()?;
        self.store
            .insert(obligation.kind.table(), to_record(&obligation)?)?;
        info!(
            obligation_id = %obligation.id,
            kind = obligation.kind.entity_name(),
            amount = %obligation.initial_amount,
            "obligation created"
        );
        Ok(obligation)
    }

    pub fn get(&self, kind: ObligationKind, id: Uuid) -> Result<Obligation> {
        load(self.store, kind.table(), kind.entity_name(), id).map(|(_, obligation)| obligation)
    }

    /// Obligations of one kind, soonest due first.
    pub fn list(&self, kind: ObligationKind) -> Result<Vec<Obligation>> {
        load_all(
            self.store,
            kind.table(),
            &Query::new().order_by("due_date", Direction::Ascending),
        )
    }

    /// Edits the terms of an obligation. Amounts are never touched.
    pub fn amend_terms(
        &self,
        kind: ObligationKind,
        id: Uuid,
        terms: ObligationTerms,
    ) -> Result<Obligation> {
        let (_, mut obligation): (_, Obligation) =
            load(self.store, kind.table(), kind.entity_name(), id)?;
        obligation.apply_terms(terms);
        obligation.validate()?;
        self.store
            .update(kind.table(), id, to_record(&obligation)?)?;
        info!(obligation_id = %id, "obligation terms amended");
        Ok(obligation)
    }

    /// Records a payment on a debt or a collection on a loan.
    ///
    /// The ledger entry and the balance update are one unit of work. A payment
    /// above the outstanding balance settles the obligation and the excess is
    /// only reported in [`PaymentOutcome::overpayment`].
    #[instrument(skip(self, obligation), fields(obligation_id = %obligation.id))]
    pub fn record_payment(
        &self,
        obligation: &Obligation,
        amount: Decimal,
        date: NaiveDate,
        account_id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<PaymentOutcome> {
        let amount = Amount::new(amount)?;
        let kind = obligation.kind;
        // Arithmetic runs on the stored state; the handle only names the row.
        let (previous, current): (_, Obligation) =
            load(self.store, kind.table(), kind.entity_name(), obligation.id)?;
        AccountService::new(self.store).ensure_exists(account_id)?;

        let description = match current.kind {
            ObligationKind::Debt => format!("Payment to {}", current.counterparty),
            ObligationKind::Loan => format!("Collection from {}", current.counterparty),
        };
        let entry =
            Transaction::new(account_id, current.kind.entry_kind(), amount, date, description)
                .with_category(category_id);
        let updated = current.apply_payment(amount);
        let overpayment = current.overpayment(amount);
        if overpayment > Decimal::ZERO {
            warn!(%overpayment, "payment exceeds outstanding balance; clamped to zero");
        }

        let mut uow = UnitOfWork::begin(self.store);
        let written = (|| -> StoreResult<()> {
            uow.insert(Table::Transactions, to_record(&entry)?)?;
            uow.update(kind.table(), current.id, to_record(&updated)?, previous)?;
            Ok(())
        })();
        if let Err(err) = written {
            return Err(match uow.abort(err) {
                Abort::RolledBack(cause) => {
                    warn!(error = %cause, "payment rolled back");
                    cause.into()
                }
                Abort::Stranded { cause, .. } => LedgerError::PartialPaymentFailure {
                    entry_id: entry.id,
                    target_id: current.id,
                    reason: cause.to_string(),
                },
            });
        }
        uow.commit();
        info!(
            balance = %updated.current_balance,
            status = %updated.status,
            "payment recorded"
        );
        Ok(PaymentOutcome {
            obligation: updated,
            entry,
            overpayment,
        })
    }
}
