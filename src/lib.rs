#![doc(test(attr(deny(warnings))))]

//! Fintrack Core keeps a personal-finance ledger consistent: derived account
//! balances, paired transfers, debt and loan payments, savings goals and
//! recurring fixed expenses, on top of a pluggable record store.

pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

pub use crate::core::LedgerManager;
pub use errors::{LedgerError, Result, ValidationError};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter and emits a startup log.
pub fn init() {
    init_with(&config::Config::default());
}

/// Initializes global tracing with `config.log_filter`. Only the first call
/// installs a subscriber.
pub fn init_with(config: &config::Config) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(&config.log_filter);
        tracing::info!(filter = %config.log_filter, "Fintrack Core tracing initialized.");
    });
}
