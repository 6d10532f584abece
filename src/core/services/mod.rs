pub mod account_service;
pub mod balance_service;
pub mod goal_service;
pub mod obligation_service;
pub mod recurrence_service;
pub mod transaction_service;
pub mod transfer_service;

pub use account_service::AccountService;
pub use balance_service::{AccountBalance, BalanceService};
pub use goal_service::{ContributionOutcome, GoalService};
pub use obligation_service::{ObligationService, PaymentOutcome};
pub use recurrence_service::{
    CatchUpReport, RecurrenceService, ScheduleAdvance, ScheduleFailure, SchedulePayment,
};
pub use transaction_service::TransactionService;
pub use transfer_service::{Transfer, TransferService};

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    domain::Identifiable,
    errors::{LedgerError, Result},
    storage::{from_record, from_records, Query, Record, RecordStore, StoreError, Table},
};

/// Fetches the raw record and its typed form, or `NotFound` naming `entity`.
/// A row whose typed id differs from `id` is rejected as invalid.
fn load<T: DeserializeOwned + Identifiable>(
    store: &dyn RecordStore,
    table: Table,
    entity: &'static str,
    id: Uuid,
) -> Result<(Record, T)> {
    let record = store
        .get(table, id)?
        .ok_or(LedgerError::NotFound { entity, id })?;
    let typed: T = from_record(record.clone())?;
    if typed.id() != id {
        return Err(StoreError::InvalidRecord {
            table,
            reason: format!("lookup of {id} returned {}", typed.id()),
        }
        .into());
    }
    Ok((record, typed))
}

fn load_all<T: DeserializeOwned>(
    store: &dyn RecordStore,
    table: Table,
    query: &Query,
) -> Result<Vec<T>> {
    Ok(from_records(store.query(table, query)?)?)
}
