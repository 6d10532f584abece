//! Paired debit/credit entries moving money between two accounts.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    core::unit_of_work::{Abort, UnitOfWork},
    domain::{Amount, ReservedCategories, Transaction},
    errors::{LedgerError, Result, TransferLeg, ValidationError},
    storage::{to_record, Direction, Filter, Query, RecordStore, StoreResult, Table},
};

use super::{load_all, AccountService};

/// Both legs of a transfer, sharing `id` as their `transfer_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub id: Uuid,
    pub debit: Transaction,
    pub credit: Transaction,
}

pub struct TransferService<'a> {
    store: &'a dyn RecordStore,
    reserved: ReservedCategories,
}

impl<'a> TransferService<'a> {
    pub fn new(store: &'a dyn RecordStore, reserved: ReservedCategories) -> Self {
        Self { store, reserved }
    }

    /// Moves `amount` from `source` to `destination` as one unit.
    #[instrument(skip(self, description))]
    pub fn transfer(
        &self,
        source: Uuid,
        destination: Uuid,
        amount: Decimal,
        date: NaiveDate,
        description: &str,
    ) -> Result<Transfer> {
        let amount = Amount::new(amount)?;
        let transfer = self.prepare(source, destination, amount, date, description)?;

        let mut uow = UnitOfWork::begin(self.store);
        if let Err(err) = self.stage(&mut uow, &transfer) {
            return Err(match uow.abort(err) {
                Abort::RolledBack(cause) => {
                    warn!(transfer_id = %transfer.id, error = %cause, "transfer rolled back");
                    cause.into()
                }
                Abort::Stranded { cause, .. } => {
                    warn!(
                        transfer_id = %transfer.id,
                        entry_id = %transfer.debit.id,
                        "debit leg stranded without its credit"
                    );
                    LedgerError::PartialTransferFailure {
                        persisted: TransferLeg::Debit,
                        entry_id: transfer.debit.id,
                        reason: cause.to_string(),
                    }
                }
            });
        }
        uow.commit();
        info!(transfer_id = %transfer.id, "transfer recorded");
        Ok(transfer)
    }

    /// Validates the pair and builds both legs without writing anything.
    pub fn prepare(
        &self,
        source: Uuid,
        destination: Uuid,
        amount: Amount,
        date: NaiveDate,
        description: &str,
    ) -> Result<Transfer> {
        if source == destination {
            return Err(ValidationError::InvalidAccountPair(source).into());
        }
        let accounts = AccountService::new(self.store);
        accounts.ensure_exists(source)?;
        accounts.ensure_exists(destination)?;

        let id = Uuid::new_v4();
        let debit = Transaction::expense(source, amount, date, description)
            .with_category(Some(self.reserved.transfer_out))
            .with_transfer(id);
        let credit = Transaction::income(destination, amount, date, description)
            .with_category(Some(self.reserved.transfer_in))
            .with_transfer(id);
        Ok(Transfer { id, debit, credit })
    }

    /// Writes both legs inside `uow`. Atomic backends take them as one batch;
    /// otherwise the debit goes first so each leg is journaled on its own.
    pub(crate) fn stage(&self, uow: &mut UnitOfWork<'_>, transfer: &Transfer) -> StoreResult<()> {
        let debit = to_record(&transfer.debit)?;
        let credit = to_record(&transfer.credit)?;
        if self.store.supports_atomic_batch() {
            uow.insert_many(Table::Transactions, vec![debit, credit])?;
        } else {
            uow.insert(Table::Transactions, debit)?;
            uow.insert(Table::Transactions, credit)?;
        }
        Ok(())
    }

    /// Both legs of `transfer_id`, debit first.
    pub fn legs(&self, transfer_id: Uuid) -> Result<Vec<Transaction>> {
        let legs: Vec<Transaction> = load_all(
            self.store,
            Table::Transactions,
            &Query::new()
                .filter(Filter::eq("transfer_id", transfer_id.to_string()))
                .order_by("amount", Direction::Ascending),
        )?;
        if legs.is_empty() {
            return Err(LedgerError::NotFound {
                entity: "transfer",
                id: transfer_id,
            });
        }
        Ok(legs)
    }

    /// Removes both legs. A removed leg is re-inserted when the other one
    /// cannot be deleted.
    #[instrument(skip(self))]
    pub fn delete_transfer(&self, transfer_id: Uuid) -> Result<Vec<Transaction>> {
        let legs = self.legs(transfer_id)?;
        let mut uow = UnitOfWork::begin(self.store);
        for leg in &legs {
            let staged = to_record(leg)
                .and_then(|previous| uow.delete(Table::Transactions, leg.id, previous));
            if let Err(err) = staged {
                return Err(match uow.abort(err) {
                    Abort::RolledBack(cause) => cause.into(),
                    Abort::Stranded { cause, stranded } => {
                        // The surviving leg is the one whose deletion was kept.
                        let survivor = legs
                            .iter()
                            .find(|leg| !stranded.iter().any(|write| write.id == leg.id))
                            .unwrap_or(leg);
                        LedgerError::PartialTransferFailure {
                            persisted: leg_side(survivor),
                            entry_id: survivor.id,
                            reason: cause.to_string(),
                        }
                    }
                });
            }
        }
        uow.commit();
        info!(%transfer_id, "transfer deleted");
        Ok(legs)
    }
}

fn leg_side(entry: &Transaction) -> TransferLeg {
    if entry.amount < Decimal::ZERO {
        TransferLeg::Debit
    } else {
        TransferLeg::Credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{AccountKind, CurrencyCode},
        ledger,
        storage::MemoryStore,
    };
    use rust_decimal_macros::dec;

    fn setup(store: &MemoryStore) -> (Uuid, Uuid) {
        let accounts = AccountService::new(store);
        let checking = accounts
            .open("Checking", AccountKind::Checking, CurrencyCode::default())
            .unwrap();
        let savings = accounts
            .open("Savings", AccountKind::Savings, CurrencyCode::default())
            .unwrap();
        (checking.id, savings.id)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    #[test]
    fn legs_mirror_each_other() {
        let store = MemoryStore::new();
        let (checking, savings) = setup(&store);
        let service = TransferService::new(&store, ReservedCategories::default());
        let transfer = service
            .transfer(checking, savings, dec!(50), date(), "Monthly saving")
            .unwrap();

        assert_eq!(transfer.debit.amount, dec!(-50));
        assert_eq!(transfer.credit.amount, dec!(50));
        assert_eq!(transfer.debit.magnitude(), transfer.credit.magnitude());
        assert_eq!(transfer.debit.transfer_id, Some(transfer.id));
        assert_eq!(transfer.credit.category_id, Some(ReservedCategories::default().transfer_in));

        let legs = service.legs(transfer.id).unwrap();
        assert_eq!(legs, vec![transfer.debit.clone(), transfer.credit.clone()]);
        let balances = ledger::balances_by_account(&legs);
        assert_eq!(balances[&checking] + balances[&savings], Decimal::ZERO);
    }

    #[test]
    fn same_account_and_zero_amount_are_rejected_before_writing() {
        let store = MemoryStore::new();
        let (checking, savings) = setup(&store);
        let service = TransferService::new(&store, ReservedCategories::default());

        let err = service
            .transfer(checking, checking, dec!(10), date(), "Loop")
            .expect_err("same account");
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::InvalidAccountPair(id)) if id == checking
        ));
        let err = service
            .transfer(checking, savings, Decimal::ZERO, date(), "Nothing")
            .expect_err("zero amount");
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::NonPositiveAmount(_))
        ));
        assert_eq!(store.count(Table::Transactions), 0);
    }

    #[test]
    fn delete_transfer_removes_both_legs() {
        let store = MemoryStore::new();
        let (checking, savings) = setup(&store);
        let service = TransferService::new(&store, ReservedCategories::default());
        let transfer = service
            .transfer(checking, savings, dec!(5), date(), "Oops")
            .unwrap();
        let removed = service.delete_transfer(transfer.id).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(store.count(Table::Transactions), 0);
        assert!(matches!(
            service.delete_transfer(transfer.id),
            Err(LedgerError::NotFound { entity: "transfer", .. })
        ));
    }
}
