//! Pure ledger computations: balances, monthly evaluation, schedule arithmetic.

pub mod balance;
pub mod schedule;
pub mod summary;

pub use balance::{account_balance, balances_by_account, balances_for};
pub use schedule::{advance, catch_up, occurrences_until, DEFAULT_ADVANCE_LIMIT};
pub use summary::{monthly_summary, MonthlySummary};
