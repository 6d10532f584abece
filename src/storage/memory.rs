use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use uuid::Uuid;

use super::{
    merge_patch, prepare_record, record_id, replacement, Query, Record, RecordStore, StoreError,
    StoreResult, Table,
};

/// Process-local store, used for tests and for embedding without a backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in `table`.
    pub fn count(&self, table: Table) -> usize {
        self.lock()
            .map(|tables| tables.get(&table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<Table, Vec<Record>>>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, table: Table, record: Record) -> StoreResult<Record> {
        let (id, record) = prepare_record(table, record)?;
        let mut tables = self.lock()?;
        let rows = tables.entry(table).or_default();
        if rows.iter().any(|row| record_id(table, row).ok() == Some(id)) {
            return Err(StoreError::InvalidRecord {
                table,
                reason: format!("duplicate id {id}"),
            });
        }
        rows.push(record.clone());
        Ok(record)
    }

    fn insert_many(&self, table: Table, records: Vec<Record>) -> StoreResult<Vec<Record>> {
        let prepared = records
            .into_iter()
            .map(|record| prepare_record(table, record))
            .collect::<StoreResult<Vec<_>>>()?;
        let mut tables = self.lock()?;
        let rows = tables.entry(table).or_default();
        for (index, (id, _)) in prepared.iter().enumerate() {
            let clash_existing = rows.iter().any(|row| record_id(table, row).ok() == Some(*id));
            let clash_batch = prepared[..index].iter().any(|(other, _)| other == id);
            if clash_existing || clash_batch {
                return Err(StoreError::InvalidRecord {
                    table,
                    reason: format!("duplicate id {id}"),
                });
            }
        }
        let inserted: Vec<Record> = prepared.into_iter().map(|(_, record)| record).collect();
        rows.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    fn update(&self, table: Table, id: Uuid, patch: Record) -> StoreResult<Record> {
        let mut tables = self.lock()?;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| record_id(table, row).ok() == Some(id))
            })
            .ok_or(StoreError::NotFound { table, id })?;
        merge_patch(table, row, patch)?;
        Ok(row.clone())
    }

    fn replace(&self, table: Table, id: Uuid, record: Record) -> StoreResult<Record> {
        let record = replacement(table, id, record)?;
        let mut tables = self.lock()?;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| record_id(table, row).ok() == Some(id))
            })
            .ok_or(StoreError::NotFound { table, id })?;
        *row = record;
        Ok(row.clone())
    }

    fn delete(&self, table: Table, id: Uuid) -> StoreResult<()> {
        let mut tables = self.lock()?;
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| record_id(table, row).ok() != Some(id));
        if rows.len() == before {
            return Err(StoreError::NotFound { table, id });
        }
        Ok(())
    }

    fn query(&self, table: Table, query: &Query) -> StoreResult<Vec<Record>> {
        let tables = self.lock()?;
        Ok(tables
            .get(&table)
            .map(|rows| query.apply(rows))
            .unwrap_or_default())
    }

    fn supports_atomic_batch(&self) -> bool {
        true
    }
}
