//! Generic record persistence consumed by the ledger services.
//!
//! Records are JSON objects keyed by an `"id"` UUID string. Backends only need
//! to honour the five operations of [`RecordStore`]; everything typed lives in
//! the services.

pub mod json_backend;
pub mod memory;
pub mod query;

use std::{cmp::Ordering, fmt, io, str::FromStr};

use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub use json_backend::JsonStore;
pub use memory::MemoryStore;
pub use query::{Direction, Filter, FilterOp, Query};

pub type Record = Value;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Tables understood by the ledger module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Accounts,
    Transactions,
    Debts,
    Loans,
    Goals,
    FixedExpenses,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Accounts,
        Table::Transactions,
        Table::Debts,
        Table::Loans,
        Table::Goals,
        Table::FixedExpenses,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Table::Accounts => "accounts",
            Table::Transactions => "transactions",
            Table::Debts => "debts",
            Table::Loans => "loans",
            Table::Goals => "goals",
            Table::FixedExpenses => "fixed_expenses",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("record {id} not found in {table}")]
    NotFound { table: Table, id: Uuid },
    #[error("invalid record for {table}: {reason}")]
    InvalidRecord { table: Table, reason: String },
    #[error("backend error: {0}")]
    Backend(String),
}

/// Abstraction over the external data store.
///
/// `update` merges the top-level fields of `patch` into the stored record and
/// returns the merged result.
pub trait RecordStore: Send + Sync {
    fn insert(&self, table: Table, record: Record) -> StoreResult<Record>;
    fn insert_many(&self, table: Table, records: Vec<Record>) -> StoreResult<Vec<Record>>;
    fn update(&self, table: Table, id: Uuid, patch: Record) -> StoreResult<Record>;
    /// Overwrites the whole stored record; fields absent from `record` are gone
    /// afterwards. The stored id is kept.
    fn replace(&self, table: Table, id: Uuid, record: Record) -> StoreResult<Record>;
    fn delete(&self, table: Table, id: Uuid) -> StoreResult<()>;
    fn query(&self, table: Table, query: &Query) -> StoreResult<Vec<Record>>;

    /// Whether `insert_many` applies all rows or none.
    fn supports_atomic_batch(&self) -> bool {
        false
    }

    fn get(&self, table: Table, id: Uuid) -> StoreResult<Option<Record>> {
        let mut rows = self.query(
            table,
            &Query::new().filter(Filter::eq("id", id.to_string())).limit(1),
        )?;
        Ok(rows.pop())
    }
}

/// Serializes a typed entity into a store record.
pub fn to_record<T: Serialize>(value: &T) -> StoreResult<Record> {
    Ok(serde_json::to_value(value)?)
}

/// Deserializes a store record into a typed entity.
pub fn from_record<T: DeserializeOwned>(record: Record) -> StoreResult<T> {
    Ok(serde_json::from_value(record)?)
}

pub fn from_records<T: DeserializeOwned>(records: Vec<Record>) -> StoreResult<Vec<T>> {
    records.into_iter().map(from_record).collect()
}

/// Reads the `"id"` field of a record.
pub fn record_id(table: Table, record: &Record) -> StoreResult<Uuid> {
    record
        .get("id")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| StoreError::InvalidRecord {
            table,
            reason: "missing or malformed `id`".into(),
        })
}

/// Ensures a record is an object carrying an id, assigning one when absent.
pub(crate) fn prepare_record(table: Table, mut record: Record) -> StoreResult<(Uuid, Record)> {
    let object = record
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidRecord {
            table,
            reason: "record must be a JSON object".into(),
        })?;
    if !object.contains_key("id") || object.get("id").is_some_and(Value::is_null) {
        object.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    }
    let id = record_id(table, &record)?;
    Ok((id, record))
}

/// Merges the top-level fields of `patch` into `target`.
pub(crate) fn merge_patch(table: Table, target: &mut Record, patch: Record) -> StoreResult<()> {
    let Value::Object(fields) = patch else {
        return Err(StoreError::InvalidRecord {
            table,
            reason: "patch must be a JSON object".into(),
        });
    };
    let object = target
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidRecord {
            table,
            reason: "stored record is not a JSON object".into(),
        })?;
    for (key, value) in fields {
        if key == "id" {
            continue;
        }
        object.insert(key, value);
    }
    Ok(())
}

/// Shapes `record` as the full replacement of row `id`.
pub(crate) fn replacement(table: Table, id: Uuid, mut record: Record) -> StoreResult<Record> {
    let object = record
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidRecord {
            table,
            reason: "replacement must be a JSON object".into(),
        })?;
    object.insert("id".into(), Value::String(id.to_string()));
    Ok(record)
}

/// Orders two JSON scalars. Decimal strings compare numerically; other strings
/// compare lexicographically, which keeps ISO dates in calendar order.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => {
            match (Decimal::from_str(a), Decimal::from_str(b)) {
                (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                _ => Some(a.cmp(b)),
            }
        }
        (Value::Number(a), Value::String(b)) => {
            let a = Decimal::from_str(&a.to_string()).ok()?;
            Some(a.cmp(&Decimal::from_str(b).ok()?))
        }
        (Value::String(a), Value::Number(b)) => {
            let b = Decimal::from_str(&b.to_string()).ok()?;
            Some(Decimal::from_str(a).ok()?.cmp(&b))
        }
        _ => None,
    }
}
