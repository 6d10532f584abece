use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{StoreError, Table};

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Input rejected before any write reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("amount must be greater than zero (got {0})")]
    NonPositiveAmount(Decimal),
    #[error("amount `{0}` is not a finite decimal number")]
    MalformedAmount(String),
    #[error("date `{0}` is not a valid YYYY-MM-DD date")]
    MalformedDate(String),
    #[error("source and destination account must differ (both {0})")]
    InvalidAccountPair(Uuid),
    #[error("transaction {id} has amount {amount} which does not match type {kind}")]
    SignMismatch {
        id: Uuid,
        amount: Decimal,
        kind: String,
    },
    #[error("transaction {0} is a transfer leg; use the transfer operations instead")]
    TransferLeg(Uuid),
    #[error("balance {current} must lie within 0..={initial}")]
    BalanceOutOfRange { initial: Decimal, current: Decimal },
    #[error("anchor day {0} is outside 1..=31")]
    InvalidAnchorDay(u32),
    #[error("unknown frequency `{0}`")]
    UnknownFrequency(String),
    #[error("currency code `{0}` is not an ISO 4217 code")]
    InvalidCurrency(String),
    #[error("month {0} is outside 1..=12")]
    InvalidMonth(u32),
    #[error("{0}")]
    Invalid(String),
}

/// Identifies one side of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferLeg {
    Debit,
    Credit,
}

impl fmt::Display for TransferLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferLeg::Debit => f.write_str("debit"),
            TransferLeg::Credit => f.write_str("credit"),
        }
    }
}

/// A write that was applied and could not be compensated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrandedWrite {
    pub table: Table,
    pub id: Uuid,
}

impl fmt::Display for StrandedWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table, self.id)
    }
}

/// Error type that captures ledger operation failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error(
        "transfer partially applied: {persisted} entry {entry_id} is persisted without its counterpart ({reason})"
    )]
    PartialTransferFailure {
        persisted: TransferLeg,
        entry_id: Uuid,
        reason: String,
    },
    #[error(
        "payment partially applied: ledger entry {entry_id} is persisted but {target_id} was not updated ({reason})"
    )]
    PartialPaymentFailure {
        entry_id: Uuid,
        target_id: Uuid,
        reason: String,
    },
    #[error("goal contribution partially applied to goal {goal_id}: stranded writes [{}] ({reason})", format_stranded(.stranded))]
    PartialContributionFailure {
        goal_id: Uuid,
        stranded: Vec<StrandedWrite>,
        reason: String,
    },
    #[error("schedule stopped at {reached} after {limit} advances without reaching {today}")]
    ScheduleAdvanceLimitExceeded {
        limit: usize,
        reached: NaiveDate,
        today: NaiveDate,
    },
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// True when existing data may need manual reconciliation.
    pub fn requires_reconciliation(&self) -> bool {
        matches!(
            self,
            LedgerError::PartialTransferFailure { .. }
                | LedgerError::PartialPaymentFailure { .. }
                | LedgerError::PartialContributionFailure { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }
}

fn format_stranded(stranded: &[StrandedWrite]) -> String {
    stranded
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
