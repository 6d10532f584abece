use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use tracing::debug;
use uuid::Uuid;

use crate::utils::{ensure_dir, tmp_path, write_atomic};

use super::{
    merge_patch, prepare_record, record_id, replacement, Query, Record, RecordStore, StoreError,
    StoreResult, Table,
};

const TABLE_EXTENSION: &str = "json";

/// File-backed store keeping one JSON array per table under `root`.
///
/// Every mutation rewrites the table file through a temporary sibling that is
/// renamed into place, so a crash leaves either the old or the new table.
#[derive(Debug)]
pub struct JsonStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        ensure_dir(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, table: Table) -> PathBuf {
        self.root
            .join(format!("{}.{}", table.as_str(), TABLE_EXTENSION))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Backend("json store lock poisoned".into()))
    }

    fn read_table(&self, table: Table) -> StoreResult<Vec<Record>> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn write_table(&self, table: Table, rows: &[Record]) -> StoreResult<()> {
        let path = self.table_path(table);
        let json = serde_json::to_string_pretty(rows)?;
        let tmp = tmp_path(&path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &path)?;
        debug!(table = %table, rows = rows.len(), "table written");
        Ok(())
    }
}

impl RecordStore for JsonStore {
    fn insert(&self, table: Table, record: Record) -> StoreResult<Record> {
        self.insert_many(table, vec![record])?
            .pop()
            .ok_or_else(|| StoreError::Backend("insert produced no record".into()))
    }

    fn insert_many(&self, table: Table, records: Vec<Record>) -> StoreResult<Vec<Record>> {
        let _guard = self.lock()?;
        let mut rows = self.read_table(table)?;
        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            let (id, record) = prepare_record(table, record)?;
            if rows.iter().any(|row| record_id(table, row).ok() == Some(id)) {
                return Err(StoreError::InvalidRecord {
                    table,
                    reason: format!("duplicate id {id}"),
                });
            }
            rows.push(record.clone());
            inserted.push(record);
        }
        self.write_table(table, &rows)?;
        Ok(inserted)
    }

    fn update(&self, table: Table, id: Uuid, patch: Record) -> StoreResult<Record> {
        let _guard = self.lock()?;
        let mut rows = self.read_table(table)?;
        let row = rows
            .iter_mut()
            .find(|row| record_id(table, row).ok() == Some(id))
            .ok_or(StoreError::NotFound { table, id })?;
        merge_patch(table, row, patch)?;
        let merged = row.clone();
        self.write_table(table, &rows)?;
        Ok(merged)
    }

    fn replace(&self, table: Table, id: Uuid, record: Record) -> StoreResult<Record> {
        let record = replacement(table, id, record)?;
        let _guard = self.lock()?;
        let mut rows = self.read_table(table)?;
        let row = rows
            .iter_mut()
            .find(|row| record_id(table, row).ok() == Some(id))
            .ok_or(StoreError::NotFound { table, id })?;
        *row = record.clone();
        self.write_table(table, &rows)?;
        Ok(record)
    }

    fn delete(&self, table: Table, id: Uuid) -> StoreResult<()> {
        let _guard = self.lock()?;
        let mut rows = self.read_table(table)?;
        let before = rows.len();
        rows.retain(|row| record_id(table, row).ok() != Some(id));
        if rows.len() == before {
            return Err(StoreError::NotFound { table, id });
        }
        self.write_table(table, &rows)
    }

    fn query(&self, table: Table, query: &Query) -> StoreResult<Vec<Record>> {
        let rows = self.read_table(table)?;
        Ok(query.apply(&rows))
    }

    fn supports_atomic_batch(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Direction, Filter};
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with_temp_dir() -> (JsonStore, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonStore::new(temp.path().join("data")).expect("json store");
        (store, temp)
    }

    #[test]
    fn rows_survive_reopen() {
        let (store, guard) = store_with_temp_dir();
        let id = Uuid::new_v4();
        store
            .insert(
                Table::Transactions,
                json!({"id": id.to_string(), "transaction_date": "2024-01-05"}),
            )
            .expect("insert");

        let reopened = JsonStore::new(guard.path().join("data")).expect("reopen");
        let rows = reopened
            .query(Table::Transactions, &Query::new())
            .expect("query");
        assert_eq!(rows.len(), 1);
        assert_eq!(record_id(Table::Transactions, &rows[0]).expect("id"), id);
    }

    #[test]
    fn table_files_use_table_names() {
        let (store, _guard) = store_with_temp_dir();
        store
            .insert(Table::FixedExpenses, json!({"description": "Rent"}))
            .expect("insert");
        let path = store.table_path(Table::FixedExpenses);
        assert!(path.ends_with("fixed_expenses.json"));
        assert!(path.exists());
        assert!(!tmp_path(&path).exists(), "staging file must be renamed away");
    }

    #[test]
    fn replace_drops_fields_missing_from_record() {
        let (store, _guard) = store_with_temp_dir();
        let row = store
            .insert(Table::Goals, json!({"name": "Bike", "notes": "blue"}))
            .expect("insert");
        let id = record_id(Table::Goals, &row).expect("id");

        store
            .replace(Table::Goals, id, json!({"name": "Scooter"}))
            .expect("replace");
        let stored = store.get(Table::Goals, id).expect("get").expect("row");
        assert_eq!(stored, json!({"id": id.to_string(), "name": "Scooter"}));
        assert!(matches!(
            store.replace(Table::Goals, Uuid::new_v4(), json!({})),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn update_and_ordered_query() {
        let (store, _guard) = store_with_temp_dir();
        let rows = store
            .insert_many(
                Table::Goals,
                vec![
                    json!({"name": "b", "current_amount": "10"}),
                    json!({"name": "a", "current_amount": "2"}),
                ],
            )
            .expect("insert many");
        let first = record_id(Table::Goals, &rows[0]).expect("id");
        store
            .update(Table::Goals, first, json!({"current_amount": "1"}))
            .expect("update");

        let ordered = store
            .query(
                Table::Goals,
                &Query::new()
                    .filter(Filter::gte("current_amount", "1"))
                    .order_by("current_amount", Direction::Ascending),
            )
            .expect("query");
        let names: Vec<_> = ordered.iter().map(|row| row["name"].clone()).collect();
        assert_eq!(names, vec![json!("b"), json!("a")]);
    }
}
