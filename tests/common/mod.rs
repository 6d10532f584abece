#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use chrono::NaiveDate;
use fintrack_core::{
    config::{Config, ConfigManager},
    core::{services::AccountService, LedgerManager},
    domain::{AccountKind, Amount, CurrencyCode},
    storage::{MemoryStore, Query, Record, RecordStore, StoreError, StoreResult, Table},
};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates a JSON-backed manager and a config manager rooted in a unique directory.
pub fn setup_test_env() -> (LedgerManager, ConfigManager) {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let config_manager =
        ConfigManager::with_base_dir(base.clone()).expect("create config manager for temp dir");
    let config = Config {
        data_dir: Some(base.join("data")),
        ..Config::default()
    };
    let ledger_manager = LedgerManager::open(config).expect("open json-backed ledger");
    (ledger_manager, config_manager)
}

pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).expect("positive amount")
}

/// Opens a checking and a savings account.
pub fn open_pair(store: &dyn RecordStore) -> (Uuid, Uuid) {
    let accounts = AccountService::new(store);
    let checking = accounts
        .open("Checking", AccountKind::Checking, CurrencyCode::default())
        .expect("open checking");
    let savings = accounts
        .open("Savings", AccountKind::Savings, CurrencyCode::default())
        .expect("open savings");
    (checking.id, savings.id)
}

pub fn rows(store: &dyn RecordStore, table: Table) -> Vec<Record> {
    store.query(table, &Query::new()).expect("query table")
}

/// Memory store that fails chosen write calls.
///
/// Writes are `insert`, `insert_many`, `update` and `delete`, counted across
/// the store's lifetime. Reads never fail.
pub struct FlakyStore {
    inner: MemoryStore,
    atomic: bool,
    writes: AtomicUsize,
    failures: Mutex<Vec<usize>>,
}

impl FlakyStore {
    /// A store without atomic batches, forcing the compensation path.
    pub fn sequential() -> Self {
        Self::new(false)
    }

    pub fn atomic() -> Self {
        Self::new(true)
    }

    fn new(atomic: bool) -> Self {
        Self {
            inner: MemoryStore::new(),
            atomic,
            writes: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Fails the given upcoming writes, counted from 1 starting with the next one.
    pub fn fail_writes(&self, upcoming: &[usize]) {
        let done = self.writes.load(Ordering::SeqCst);
        let mut failures = self.failures.lock().expect("lock failure plan");
        failures.clear();
        failures.extend(upcoming.iter().map(|nth| done + nth));
    }

    pub fn count(&self, table: Table) -> usize {
        self.inner.count(table)
    }

    fn check(&self) -> StoreResult<()> {
        let nth = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        let planned = self
            .failures
            .lock()
            .map_err(|_| StoreError::Backend("failure plan poisoned".into()))?
            .contains(&nth);
        if planned {
            Err(StoreError::Backend(format!("injected failure on write #{nth}")))
        } else {
            Ok(())
        }
    }
}

impl RecordStore for FlakyStore {
    fn insert(&self, table: Table, record: Record) -> StoreResult<Record> {
        self.check()?;
        self.inner.insert(table, record)
    }

    fn insert_many(&self, table: Table, records: Vec<Record>) -> StoreResult<Vec<Record>> {
        self.check()?;
        self.inner.insert_many(table, records)
    }

    fn update(&self, table: Table, id: Uuid, patch: Record) -> StoreResult<Record> {
        self.check()?;
        self.inner.update(table, id, patch)
    }

    fn replace(&self, table: Table, id: Uuid, record: Record) -> StoreResult<Record> {
        self.check()?;
        self.inner.replace(table, id, record)
    }

    fn delete(&self, table: Table, id: Uuid) -> StoreResult<()> {
        self.check()?;
        self.inner.delete(table, id)
    }

    fn query(&self, table: Table, query: &Query) -> StoreResult<Vec<Record>> {
        self.inner.query(table, query)
    }

    fn supports_atomic_batch(&self) -> bool {
        self.atomic
    }
}
