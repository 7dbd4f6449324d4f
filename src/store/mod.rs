//! Storage collaborator for the reconciler.
//!
//! Two backends implement the same row-level interface:
//!
//! - [`MemStore`](mem::MemStore): in-memory tables, a working copy per transaction
//! - [`DurableStore`](durable::DurableStore): ACID tables on disk (redb)
//!
//! A reconciliation pass runs inside exactly one [`Transaction`]; rows
//! written earlier in the pass are visible to later lookups in the same
//! pass. Dropping a transaction without committing discards its writes.

pub mod durable;
pub mod mem;

use crate::error::StoreError;
use crate::model::{Record, RowId, Table};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Untyped row access: every row is an encoded blob keyed by its id.
pub trait RowStore {
    /// Reserve the next surrogate id for `table`.
    fn allocate_id(&mut self, table: Table) -> StoreResult<RowId>;

    /// Insert or replace the row stored under `id`.
    fn put_raw(&mut self, table: Table, id: RowId, bytes: Vec<u8>) -> StoreResult<()>;

    /// Read the row stored under `id`.
    fn get_raw(&self, table: Table, id: RowId) -> StoreResult<Option<Vec<u8>>>;

    /// Delete the row stored under `id`. Returns whether it existed.
    fn remove_raw(&mut self, table: Table, id: RowId) -> StoreResult<bool>;

    /// All rows of `table` in ascending id order (= insertion order).
    fn scan_raw(&self, table: Table) -> StoreResult<Vec<(RowId, Vec<u8>)>>;
}

/// A unit of work that is either committed as a whole or discarded.
pub trait Transaction: RowStore {
    /// Make every write of this transaction durable and visible.
    fn commit(self) -> StoreResult<()>;

    /// Discard every write of this transaction.
    fn rollback(self) -> StoreResult<()>;
}

/// A store that hands out write transactions.
///
/// `begin` borrows the backend exclusively, so at most one reconciliation
/// pass can be in flight per backend.
pub trait Backend {
    type Txn<'a>: Transaction
    where
        Self: 'a;

    fn begin(&mut self) -> StoreResult<Self::Txn<'_>>;
}

pub(crate) fn encode<R: Record>(row: &R) -> StoreResult<Vec<u8>> {
    bincode::serialize(row).map_err(|e| StoreError::Codec {
        table: R::TABLE,
        message: e.to_string(),
    })
}

pub(crate) fn decode<R: Record>(bytes: &[u8]) -> StoreResult<R> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Codec {
        table: R::TABLE,
        message: e.to_string(),
    })
}

/// Typed row access on top of any [`RowStore`].
pub trait TypedStore: RowStore {
    /// Persist a new row, assigning its id. Returns the stored row.
    fn insert<R: Record>(&mut self, mut row: R) -> StoreResult<R> {
        let id = self.allocate_id(R::TABLE)?;
        row.set_id(id);
        self.put_raw(R::TABLE, id, encode(&row)?)?;
        Ok(row)
    }

    /// Overwrite a persisted row in place.
    fn update<R: Record>(&mut self, row: &R) -> StoreResult<()> {
        let id = row.id().ok_or(StoreError::Unpersisted { table: R::TABLE })?;
        self.put_raw(R::TABLE, id, encode(row)?)
    }

    /// Delete a persisted row. Returns whether it still existed.
    fn delete<R: Record>(&mut self, row: &R) -> StoreResult<bool> {
        let id = row.id().ok_or(StoreError::Unpersisted { table: R::TABLE })?;
        self.remove_raw(R::TABLE, id)
    }

    /// Point lookup by surrogate id.
    fn get<R: Record>(&self, id: RowId) -> StoreResult<Option<R>> {
        self.get_raw(R::TABLE, id)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// First row (by insertion order) satisfying `pred`.
    fn first_where<R: Record>(&self, pred: impl Fn(&R) -> bool) -> StoreResult<Option<R>> {
        for (_, bytes) in self.scan_raw(R::TABLE)? {
            let row: R = decode(&bytes)?;
            if pred(&row) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// All rows satisfying `pred`, in insertion order.
    fn all_where<R: Record>(&self, pred: impl Fn(&R) -> bool) -> StoreResult<Vec<R>> {
        let mut rows = Vec::new();
        for (_, bytes) in self.scan_raw(R::TABLE)? {
            let row: R = decode(&bytes)?;
            if pred(&row) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Number of rows in the table of `R`.
    fn count<R: Record>(&self) -> StoreResult<usize> {
        Ok(self.scan_raw(R::TABLE)?.len())
    }
}

impl<T: RowStore + ?Sized> TypedStore for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Organism;

    #[test]
    fn typed_insert_get_update_delete() {
        let mut store = mem::MemStore::new();
        let mut txn = store.begin().unwrap();

        let org = txn.insert(Organism::new("Plasmodium", "falciparum", "Pfalciparum")).unwrap();
        let id = org.id.unwrap();

        let mut loaded: Organism = txn.get(id).unwrap().unwrap();
        assert_eq!(loaded.abbreviation, "Pfalciparum");

        loaded.common_name = Some("malaria parasite".into());
        txn.update(&loaded).unwrap();
        let reloaded: Organism = txn.get(id).unwrap().unwrap();
        assert_eq!(reloaded.common_name.as_deref(), Some("malaria parasite"));

        assert!(txn.delete(&reloaded).unwrap());
        assert!(txn.get::<Organism>(id).unwrap().is_none());
        assert!(!txn.delete(&reloaded).unwrap());
    }

    #[test]
    fn update_requires_persisted_row() {
        let mut store = mem::MemStore::new();
        let mut txn = store.begin().unwrap();
        let err = txn
            .update(&Organism::new("Plasmodium", "berghei", "Pberghei"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Unpersisted { table: Table::Organism }));
    }

    #[test]
    fn scans_follow_insertion_order() {
        let mut store = mem::MemStore::new();
        let mut txn = store.begin().unwrap();
        for abbr in ["c", "a", "b"] {
            txn.insert(Organism::new("G", abbr, abbr)).unwrap();
        }
        let all: Vec<Organism> = txn.all_where(|_| true).unwrap();
        let order: Vec<_> = all.iter().map(|o| o.abbreviation.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);

        let first: Organism = txn.first_where(|o: &Organism| o.species != "c").unwrap().unwrap();
        assert_eq!(first.abbreviation, "a");
        assert_eq!(txn.count::<Organism>().unwrap(), 3);
    }
}
