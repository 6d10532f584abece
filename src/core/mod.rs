pub mod ledger_manager;
pub mod services;
pub mod time;
pub mod unit_of_work;

pub use ledger_manager::LedgerManager;
pub use time::{Clock, FixedClock, SystemClock};
pub use unit_of_work::{Abort, UnitOfWork};
