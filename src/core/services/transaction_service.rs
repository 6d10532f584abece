//! Business logic helpers for ordinary ledger entries.

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    core::services::AccountService,
    domain::{Transaction, TransactionAmendment},
    errors::{Result, ValidationError},
    storage::{to_record, Direction, Filter, Query, RecordStore, Table},
};

use super::{load, load_all};

const ENTITY: &str = "transaction";

/// Validated create, amend and delete operations for single-leg entries.
///
/// Transfer legs are managed by [`super::TransferService`] only.
pub struct TransactionService<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> TransactionService<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// Persists a new entry on an existing account.
    pub fn record(&self, transaction: Transaction) -> Result<Transaction> {
        if transaction.is_transfer_leg() {
            return Err(ValidationError::TransferLeg(transaction.id).into());
        }
        transaction.validate()?;
        AccountService::new(self.store).ensure_exists(transaction.account_id)?;
        self.store
            .insert(Table::Transactions, to_record(&transaction)?)?;
        debug!(
            transaction_id = %transaction.id,
            account_id = %transaction.account_id,
            amount = %transaction.amount,
            "transaction recorded"
        );
        Ok(transaction)
    }

    /// Applies a corrective edit and returns the stored result.
    pub fn amend(&self, id: Uuid, amendment: TransactionAmendment) -> Result<Transaction> {
        let (_, mut transaction): (_, Transaction) =
            load(self.store, Table::Transactions, ENTITY, id)?;
        if transaction.is_transfer_leg() {
            return Err(ValidationError::TransferLeg(id).into());
        }
        transaction.amend(amendment);
        transaction.validate()?;
        self.store
            .update(Table::Transactions, id, to_record(&transaction)?)?;
        info!(transaction_id = %id, amount = %transaction.amount, "transaction amended");
        Ok(transaction)
    }

    /// Removes the entry identified by `id`, returning the removed instance.
    pub fn delete(&self, id: Uuid) -> Result<Transaction> {
        let (_, transaction): (_, Transaction) =
            load(self.store, Table::Transactions, ENTITY, id)?;
        if transaction.is_transfer_leg() {
            return Err(ValidationError::TransferLeg(id).into());
        }
        self.store.delete(Table::Transactions, id)?;
        info!(transaction_id = %id, "transaction deleted");
        Ok(transaction)
    }

    pub fn get(&self, id: Uuid) -> Result<Transaction> {
        load(self.store, Table::Transactions, ENTITY, id).map(|(_, txn)| txn)
    }

    /// Entries of one account in date order.
    pub fn list_for_account(&self, account_id: Uuid) -> Result<Vec<Transaction>> {
        load_all(
            self.store,
            Table::Transactions,
            &Query::new()
                .filter(Filter::eq("account_id", account_id.to_string()))
                .order_by("transaction_date", Direction::Ascending),
        )
    }

    /// The whole log in date order.
    pub fn list(&self) -> Result<Vec<Transaction>> {
        load_all(
            self.store,
            Table::Transactions,
            &Query::new().order_by("transaction_date", Direction::Ascending),
        )
    }
}
