//! Multi-write operations with compensation on failure.
//!
//! Every write applied through a [`UnitOfWork`] is journaled together with the
//! write that undoes it. Aborting replays the journal in reverse; writes that
//! cannot be undone are reported back as stranded.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    errors::StrandedWrite,
    storage::{record_id, Record, RecordStore, StoreResult, Table},
};

#[derive(Debug)]
enum Compensation {
    Delete { table: Table, id: Uuid },
    Restore { table: Table, id: Uuid, previous: Record },
    Reinsert { table: Table, record: Record },
}

impl Compensation {
    fn target(&self) -> StrandedWrite {
        match self {
            Compensation::Delete { table, id } | Compensation::Restore { table, id, .. } => {
                StrandedWrite {
                    table: *table,
                    id: *id,
                }
            }
            Compensation::Reinsert { table, record } => StrandedWrite {
                table: *table,
                id: record_id(*table, record).unwrap_or_default(),
            },
        }
    }

    fn apply(self, store: &dyn RecordStore) -> StoreResult<()> {
        match self {
            Compensation::Delete { table, id } => store.delete(table, id),
            Compensation::Restore {
                table,
                id,
                previous,
            } => store.replace(table, id, previous).map(|_| ()),
            Compensation::Reinsert { table, record } => store.insert(table, record).map(|_| ()),
        }
    }
}

/// Outcome of [`UnitOfWork::abort`].
#[derive(Debug)]
pub enum Abort<E> {
    /// Every applied write was compensated.
    RolledBack(E),
    /// Some writes stayed applied.
    Stranded { cause: E, stranded: Vec<StrandedWrite> },
}

impl<E> Abort<E> {
    pub fn cause(&self) -> &E {
        match self {
            Abort::RolledBack(cause) | Abort::Stranded { cause, .. } => cause,
        }
    }
}

pub struct UnitOfWork<'a> {
    store: &'a dyn RecordStore,
    journal: Vec<Compensation>,
}

impl<'a> UnitOfWork<'a> {
    pub fn begin(store: &'a dyn RecordStore) -> Self {
        Self {
            store,
            journal: Vec::new(),
        }
    }

    pub fn insert(&mut self, table: Table, record: Record) -> StoreResult<Record> {
        let stored = self.store.insert(table, record)?;
        let id = record_id(table, &stored)?;
        debug!(%table, %id, "inserted record");
        self.journal.push(Compensation::Delete { table, id });
        Ok(stored)
    }

    /// Inserts a batch. A non-atomic backend may fail halfway; only rows it
    /// returned are journaled, so callers wanting row-level tracking on such
    /// stores insert one record at a time.
    pub fn insert_many(&mut self, table: Table, records: Vec<Record>) -> StoreResult<Vec<Record>> {
        let stored = self.store.insert_many(table, records)?;
        for record in &stored {
            let id = record_id(table, record)?;
            self.journal.push(Compensation::Delete { table, id });
        }
        debug!(%table, count = stored.len(), "inserted batch");
        Ok(stored)
    }

    /// Applies `patch` to the record whose current state is `previous`.
    pub fn update(
        &mut self,
        table: Table,
        id: Uuid,
        patch: Record,
        previous: Record,
    ) -> StoreResult<Record> {
        let stored = self.store.update(table, id, patch)?;
        debug!(%table, %id, "updated record");
        self.journal.push(Compensation::Restore {
            table,
            id,
            previous,
        });
        Ok(stored)
    }

    pub fn delete(&mut self, table: Table, id: Uuid, previous: Record) -> StoreResult<()> {
        self.store.delete(table, id)?;
        debug!(%table, %id, "deleted record");
        self.journal.push(Compensation::Reinsert {
            table,
            record: previous,
        });
        Ok(())
    }

    /// Writes applied so far, oldest first.
    pub fn applied(&self) -> Vec<StrandedWrite> {
        self.journal.iter().map(Compensation::target).collect()
    }

    pub fn commit(self) {
        debug!(writes = self.journal.len(), "unit of work committed");
    }

    /// Undoes the applied writes, newest first. Compensation failures are
    /// collected, never retried.
    pub fn abort<E>(self, cause: E) -> Abort<E> {
        let store = self.store;
        let mut stranded = Vec::new();
        for compensation in self.journal.into_iter().rev() {
            let target = compensation.target();
            if let Err(err) = compensation.apply(store) {
                warn!(write = %target, error = %err, "compensation failed");
                stranded.push(target);
            }
        }
        if stranded.is_empty() {
            Abort::RolledBack(cause)
        } else {
            Abort::Stranded { cause, stranded }
        }
    }
}
