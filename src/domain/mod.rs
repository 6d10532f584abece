//! Entities of the ledger module. No I/O, only data types and their invariants.

pub mod account;
pub mod category;
pub mod common;
pub mod fixed_expense;
pub mod goal;
pub mod obligation;
pub mod transaction;

pub use account::{Account, AccountKind};
pub use category::ReservedCategories;
pub use common::{parse_date, Amount, CurrencyCode, Identifiable};
pub use fixed_expense::{Frequency, Period, ScheduledFixedExpense};
pub use goal::Goal;
pub use obligation::{derive_status, Obligation, ObligationKind, ObligationStatus, ObligationTerms};
pub use transaction::{Transaction, TransactionAmendment, TransactionKind};
