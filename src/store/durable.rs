//! ACID-durable backend backed by redb.
//!
//! Every entity kind gets its own redb table (`u64` id → encoded row) and a
//! `sequences` table remembers the last id handed out per table. A
//! reconciliation pass is one redb write transaction, so a failed pass
//! leaves the database exactly as it was.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};

use crate::error::StoreError;
use crate::model::{RowId, Table};
use crate::store::{Backend, RowStore, StoreResult, Transaction};

/// File name of the database inside the data directory.
pub const DB_FILE: &str = "chado.redb";

/// Last id handed out, per table name.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

fn rows(table: Table) -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(table.name())
}

fn redb_err(op: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Redb {
        message: format!("{op} failed: {e}"),
    }
}

/// Persistent store using redb.
pub struct DurableStore {
    db: Database,
}

impl DurableStore {
    /// Open or create a durable store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join(DB_FILE);
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        tracing::debug!(path = %db_path.display(), "opened durable store");
        Ok(Self { db })
    }

    /// Number of committed rows in `table`.
    pub fn len(&self, table: Table) -> StoreResult<usize> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let handle = match txn.open_table(rows(table)) {
            Ok(handle) => handle,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(e) => return Err(redb_err("open_table", e)),
        };
        let mut count = 0;
        for entry in handle.iter().map_err(|e| redb_err("iter", e))? {
            entry.map_err(|e| redb_err("iter", e))?;
            count += 1;
        }
        Ok(count)
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish()
    }
}

impl Backend for DurableStore {
    type Txn<'a> = DurableTransaction;

    fn begin(&mut self) -> StoreResult<Self::Txn<'_>> {
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        Ok(DurableTransaction { txn })
    }
}

/// One redb write transaction. Dropping it without commit aborts it.
pub struct DurableTransaction {
    txn: WriteTransaction,
}

impl std::fmt::Debug for DurableTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableTransaction").finish()
    }
}

impl RowStore for DurableTransaction {
    fn allocate_id(&mut self, table: Table) -> StoreResult<RowId> {
        let mut seq = self.txn.open_table(SEQUENCES).map_err(|e| redb_err("open_table", e))?;
        let last = seq
            .get(table.name())
            .map_err(|e| redb_err("get", e))?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = last
            .checked_add(1)
            .ok_or(StoreError::IdSpaceExhausted { table })?;
        seq.insert(table.name(), next).map_err(|e| redb_err("insert", e))?;
        RowId::new(next).ok_or(StoreError::IdSpaceExhausted { table })
    }

    fn put_raw(&mut self, table: Table, id: RowId, bytes: Vec<u8>) -> StoreResult<()> {
        let mut handle = self.txn.open_table(rows(table)).map_err(|e| redb_err("open_table", e))?;
        handle
            .insert(id.get(), bytes.as_slice())
            .map_err(|e| redb_err("insert", e))?;
        Ok(())
    }

    fn get_raw(&self, table: Table, id: RowId) -> StoreResult<Option<Vec<u8>>> {
        let handle = self.txn.open_table(rows(table)).map_err(|e| redb_err("open_table", e))?;
        let result = handle.get(id.get()).map_err(|e| redb_err("get", e))?;
        Ok(result.map(|guard| guard.value().to_vec()))
    }

    fn remove_raw(&mut self, table: Table, id: RowId) -> StoreResult<bool> {
        let mut handle = self.txn.open_table(rows(table)).map_err(|e| redb_err("open_table", e))?;
        let existed = handle.remove(id.get()).map_err(|e| redb_err("remove", e))?.is_some();
        Ok(existed)
    }

    fn scan_raw(&self, table: Table) -> StoreResult<Vec<(RowId, Vec<u8>)>> {
        let handle = self.txn.open_table(rows(table)).map_err(|e| redb_err("open_table", e))?;
        let mut out = Vec::new();
        for entry in handle.iter().map_err(|e| redb_err("iter", e))? {
            let (key, value) = entry.map_err(|e| redb_err("iter", e))?;
            if let Some(id) = RowId::new(key.value()) {
                out.push((id, value.value().to_vec()));
            }
        }
        Ok(out)
    }
}

impl Transaction for DurableTransaction {
    fn commit(self) -> StoreResult<()> {
        self.txn.commit().map_err(|e| redb_err("commit", e))
    }

    fn rollback(self) -> StoreResult<()> {
        self.txn.abort().map_err(|e| redb_err("abort", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Organism;
    use crate::store::TypedStore;
    use tempfile::TempDir;

    #[test]
    fn committed_rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = DurableStore::open(dir.path()).unwrap();
            let mut txn = store.begin().unwrap();
            txn.insert(Organism::new("Plasmodium", "falciparum", "Pfalciparum"))
                .unwrap();
            txn.commit().unwrap();
        }

        let mut store = DurableStore::open(dir.path()).unwrap();
        assert_eq!(store.len(Table::Organism).unwrap(), 1);
        let txn = store.begin().unwrap();
        let found = txn
            .first_where(|o: &Organism| o.abbreviation == "Pfalciparum")
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn rollback_discards_rows() {
        let dir = TempDir::new().unwrap();
        let mut store = DurableStore::open(dir.path()).unwrap();

        let mut txn = store.begin().unwrap();
        txn.insert(Organism::new("Plasmodium", "vivax", "Pvivax")).unwrap();
        txn.rollback().unwrap();

        assert_eq!(store.len(Table::Organism).unwrap(), 0);
    }

    #[test]
    fn writes_are_visible_inside_the_transaction() {
        let dir = TempDir::new().unwrap();
        let mut store = DurableStore::open(dir.path()).unwrap();

        let mut txn = store.begin().unwrap();
        let first = txn.insert(Organism::new("G", "a", "a")).unwrap();
        let second = txn.insert(Organism::new("G", "b", "b")).unwrap();
        assert!(first.id < second.id);
        let all: Vec<Organism> = txn.all_where(|_| true).unwrap();
        assert_eq!(all.len(), 2);
        assert!(txn.delete(&first).unwrap());
        assert_eq!(txn.count::<Organism>().unwrap(), 1);
    }
}
