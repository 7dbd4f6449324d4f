//! Record matcher: decides whether a candidate already has a stored counterpart.
//!
//! Two kinds of entities are matched differently:
//!
//! - [`Singleton`]s (features, locations, publications, synonyms) carry a
//!   unique natural key and are looked up directly in the store.
//! - [`Member`]s of a feature's collections (properties, cross references,
//!   synonyms, terms, publications, relationships) share a structural slot
//!   signature rather than a unique key, so they are matched against the
//!   rows already loaded for the parent feature.
//!
//! When several stored rows match, the first one in insertion order wins.

use crate::diff::Diffable;
use crate::model::{Record, RowId};
use crate::store::{RowStore, StoreResult, TypedStore};

/// An entity with a unique natural key.
pub trait Singleton: Record + Diffable {
    /// Noun used in audit lines ("feature", "publication", ...).
    const NOUN: &'static str;

    /// Whether `self` and `other` share the natural key.
    fn same_key(&self, other: &Self) -> bool;

    /// Human-readable identification for audit lines, e.g. `feature 'gene1'`.
    fn label(&self) -> String;
}

/// A member of a per-feature collection.
pub trait Member: Record + Diffable {
    /// Noun used in audit lines ("property", "cross reference", ...).
    const NOUN: &'static str;

    /// Whether members of this kind are partitioned by an ordinal rank
    /// (several values per slot, told apart only by rank).
    const RANKED: bool = false;

    /// Id of the owning feature.
    fn parent(&self) -> RowId;

    /// Structural signature used when matching candidates against stored rows.
    fn same_slot(&self, other: &Self) -> bool;

    /// Full signature, including rank where the schema has one. A stored row
    /// whose full signature appears among the candidates is never deleted.
    fn same_signature(&self, other: &Self) -> bool;

    /// Rank of a rank-partitioned member.
    fn rank(&self) -> i32 {
        0
    }

    fn set_rank(&mut self, _rank: i32) {}

    /// Value equality within a slot, for rank-partitioned members.
    fn same_value(&self, _other: &Self) -> bool {
        true
    }

    /// Human-readable description for audit lines, e.g. `property 'note' = 'A'`.
    fn describe<S: RowStore + ?Sized>(&self, store: &S) -> StoreResult<String>;
}

/// Look up the stored counterpart of a singleton candidate.
pub fn find_persisted<R, S>(store: &S, candidate: &R) -> StoreResult<Option<R>>
where
    R: Singleton,
    S: RowStore + ?Sized,
{
    store.first_where(|row: &R| row.same_key(candidate))
}

/// First row of `existing` occupying the same slot as `candidate`.
pub fn find_match<'a, R: Member>(existing: &'a [R], candidate: &R) -> Option<&'a R> {
    existing.iter().find(|row| row.same_slot(candidate))
}

/// Every row of `existing` occupying the same slot as `candidate`, in order.
pub fn find_slot_matches<'a, R: Member>(
    existing: &'a [R],
    candidate: &'a R,
) -> impl Iterator<Item = &'a R> + 'a {
    existing.iter().filter(move |row| row.same_slot(candidate))
}

/// Whether some candidate carries the full signature of `row`.
pub fn signature_present<R: Member>(candidates: &[R], row: &R) -> bool {
    candidates.iter().any(|c| c.same_signature(row))
}
