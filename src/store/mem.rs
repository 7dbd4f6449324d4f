//! In-memory backend.
//!
//! Each transaction works on a private copy of all tables; commit swaps the
//! copy in, rollback (or drop) throws it away. All data is lost on process
//! exit.

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::model::{RowId, Table};
use crate::store::{Backend, RowStore, StoreResult, Transaction};

#[derive(Debug, Clone, Default)]
struct MemTables {
    rows: BTreeMap<Table, BTreeMap<RowId, Vec<u8>>>,
    last_ids: BTreeMap<Table, u64>,
}

/// Non-persistent store, mainly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemStore {
    tables: MemTables,
}

impl MemStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed rows in `table`.
    pub fn len(&self, table: Table) -> usize {
        self.tables.rows.get(&table).map_or(0, BTreeMap::len)
    }

    /// Whether no table holds a committed row.
    pub fn is_empty(&self) -> bool {
        self.tables.rows.values().all(BTreeMap::is_empty)
    }
}

impl Backend for MemStore {
    type Txn<'a> = MemTransaction<'a>;

    fn begin(&mut self) -> StoreResult<Self::Txn<'_>> {
        let working = self.tables.clone();
        Ok(MemTransaction {
            store: self,
            working,
        })
    }
}

/// Write transaction over a [`MemStore`].
#[derive(Debug)]
pub struct MemTransaction<'a> {
    store: &'a mut MemStore,
    working: MemTables,
}

impl RowStore for MemTransaction<'_> {
    fn allocate_id(&mut self, table: Table) -> StoreResult<RowId> {
        let last = self.working.last_ids.entry(table).or_insert(0);
        let next = last
            .checked_add(1)
            .ok_or(StoreError::IdSpaceExhausted { table })?;
        *last = next;
        RowId::new(next).ok_or(StoreError::IdSpaceExhausted { table })
    }

    fn put_raw(&mut self, table: Table, id: RowId, bytes: Vec<u8>) -> StoreResult<()> {
        self.working.rows.entry(table).or_default().insert(id, bytes);
        Ok(())
    }

    fn get_raw(&self, table: Table, id: RowId) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .working
            .rows
            .get(&table)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    fn remove_raw(&mut self, table: Table, id: RowId) -> StoreResult<bool> {
        Ok(self
            .working
            .rows
            .get_mut(&table)
            .is_some_and(|rows| rows.remove(&id).is_some()))
    }

    fn scan_raw(&self, table: Table) -> StoreResult<Vec<(RowId, Vec<u8>)>> {
        Ok(self
            .working
            .rows
            .get(&table)
            .map(|rows| rows.iter().map(|(id, b)| (*id, b.clone())).collect())
            .unwrap_or_default())
    }
}

impl Transaction for MemTransaction<'_> {
    fn commit(self) -> StoreResult<()> {
        self.store.tables = self.working;
        Ok(())
    }

    fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}
