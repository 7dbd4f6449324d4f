//! Set-level reconciliation of a feature's collections.
//!
//! [`reconcile_set`] compares the complete stored collection of one parent
//! with the complete incoming collection and applies the difference in two
//! passes:
//!
//! 1. **Forward** (candidate → stored). Each candidate is matched on its
//!    slot. Rank-partitioned kinds reuse a row holding the same value or are
//!    inserted at a fresh rank (see [`crate::rank`]); other kinds are diffed
//!    onto the first match. Unmatched candidates are inserted. Rows inserted
//!    earlier in the pass take part in matching, so duplicate candidates
//!    collapse onto one row.
//! 2. **Reverse** (stored → candidate). A stored row survives if the forward
//!    pass resolved a candidate to it or if some candidate declares its full
//!    signature. Every other stored row is deleted.

use std::collections::BTreeSet;

use crate::audit::{self, AuditAction, AuditEvent, AuditSink};
use crate::diff::apply_diff;
use crate::error::StoreError;
use crate::matcher::{Member, find_match, find_slot_matches, signature_present};
use crate::model::RowId;
use crate::rank::{RankDecision, allocate_rank};
use crate::store::{RowStore, StoreResult, TypedStore};

/// Counts of one reconciliation pass plus the surviving collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetReport<R> {
    /// Stored rows left untouched.
    pub kept: usize,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Surviving rows: stored rows first, then inserted ones, in insertion order.
    pub retained: Vec<R>,
}

impl<R> SetReport<R> {
    /// Number of effective changes.
    pub fn changes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

enum Landing<R> {
    Row(RowId),
    Insert(R),
}

/// Reconcile the stored collection `existing` of one parent with `candidates`.
///
/// `existing` must hold persisted rows (as returned by the store) in
/// insertion order. `context` names the parent in audit lines, e.g.
/// `feature 'g1'`.
pub fn reconcile_set<R, S>(
    store: &mut S,
    audit: &dyn AuditSink,
    existing: Vec<R>,
    candidates: Vec<R>,
    context: &str,
) -> StoreResult<SetReport<R>>
where
    R: Member,
    S: RowStore + ?Sized,
{
    if existing.iter().any(|row| row.id().is_none()) {
        return Err(StoreError::Unpersisted { table: R::TABLE });
    }

    let stored = existing.len();
    let mut working = existing;
    let mut resolved = BTreeSet::new();
    let mut updated = BTreeSet::new();
    let mut inserted = 0;

    for candidate in &candidates {
        let landing = if R::RANKED {
            match allocate_rank(candidate, find_slot_matches(&working, candidate)) {
                RankDecision::Existing(row) => match row.id() {
                    Some(id) => Landing::Row(id),
                    None => Landing::Insert(candidate.clone()),
                },
                RankDecision::Fresh(rank) => {
                    let mut fresh = candidate.clone();
                    fresh.set_rank(rank);
                    Landing::Insert(fresh)
                }
            }
        } else {
            match find_match(&working, candidate) {
                Some(row) => {
                    if !row.same_signature(candidate) {
                        // First match wins; fields outside the diff are kept as stored.
                        tracing::debug!(
                            table = %R::TABLE,
                            id = ?row.id(),
                            "candidate resolved to stored row with a different signature"
                        );
                    }
                    match row.id() {
                        Some(id) => Landing::Row(id),
                        None => Landing::Insert(candidate.clone()),
                    }
                }
                None => Landing::Insert(candidate.clone()),
            }
        };

        match landing {
            Landing::Row(id) => {
                resolved.insert(id);
                let Some(row) = working.iter_mut().find(|row| row.id() == Some(id)) else {
                    continue;
                };
                if apply_diff(row, candidate, R::MUTABLE_FIELDS) {
                    store.update(&*row)?;
                    updated.insert(id);
                    let subject = row.describe(&*store)?;
                    audit::emit(audit, AuditEvent::new(AuditAction::Updated, subject, context));
                }
            }
            Landing::Insert(row) => {
                let row = store.insert(row)?;
                let subject = row.describe(&*store)?;
                audit::emit(audit, AuditEvent::new(AuditAction::Inserted, subject, context));
                inserted += 1;
                working.push(row);
            }
        }
    }

    let mut kept = 0;
    let mut deleted = 0;
    let mut retained = Vec::with_capacity(working.len());
    for (index, row) in working.into_iter().enumerate() {
        let id = row.id();
        let survives = index >= stored
            || id.is_some_and(|id| resolved.contains(&id))
            || signature_present(&candidates, &row);
        if survives {
            if index < stored && !id.is_some_and(|id| updated.contains(&id)) {
                kept += 1;
            }
            retained.push(row);
            continue;
        }
        let subject = row.describe(&*store)?;
        store.delete(&row)?;
        audit::emit(audit, AuditEvent::new(AuditAction::Deleted, subject, context));
        deleted += 1;
    }

    tracing::debug!(
        table = %R::TABLE,
        kept,
        inserted,
        updated = updated.len(),
        deleted,
        "reconciled collection"
    );

    Ok(SetReport {
        kept,
        inserted,
        updated: updated.len(),
        deleted,
        retained,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::VecSink;
    use crate::model::{
        Cv, CvTerm, Db, DbxRef, FeatureCvTerm, FeatureDbxRef, FeatureProp, FeatureSynonym, Pub,
        Synonym,
    };
    use crate::store::Backend;
    use crate::store::mem::MemStore;

    fn id(raw: u64) -> RowId {
        RowId::new(raw).unwrap()
    }

    /// Inserts a `note` term and returns its id.
    fn note_term<S: RowStore>(txn: &mut S) -> RowId {
        let db = txn.insert(Db::new("local")).unwrap();
        let xref = txn.insert(DbxRef::new(db.id.unwrap(), "note")).unwrap();
        let cv = txn.insert(Cv::new("feature_property")).unwrap();
        txn.insert(CvTerm::new(cv.id.unwrap(), xref.id.unwrap(), "note"))
            .unwrap()
            .id
            .unwrap()
    }

    #[test]
    fn different_value_at_same_rank_goes_to_next_rank() {
        let mut store = MemStore::new();
        let sink = VecSink::new();
        let mut txn = store.begin().unwrap();
        let note = note_term(&mut txn);
        let stored = txn.insert(FeatureProp::new(id(1), note, "A", 0)).unwrap();

        let report = reconcile_set(
            &mut txn,
            &sink,
            vec![stored.clone()],
            vec![FeatureProp::new(id(1), note, "B", 0)],
            "feature 'g1'",
        )
        .unwrap();

        assert_eq!((report.inserted, report.updated, report.deleted), (1, 0, 0));
        assert_eq!(report.kept, 1);
        assert_eq!(report.retained[0], stored);
        assert_eq!(report.retained[1].rank, 1);
        assert_eq!(report.retained[1].value.as_deref(), Some("B"));
        assert_eq!(
            sink.lines(),
            vec!["Inserted property 'note' = 'B' for feature 'g1'"]
        );
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut store = MemStore::new();
        let sink = VecSink::new();
        let mut txn = store.begin().unwrap();
        let note = note_term(&mut txn);
        let candidates = vec![
            FeatureProp::new(id(1), note, "A", 0),
            FeatureProp::new(id(1), note, "B", 1),
        ];

        let first = reconcile_set(&mut txn, &sink, Vec::new(), candidates.clone(), "").unwrap();
        assert_eq!(first.inserted, 2);

        let existing: Vec<FeatureProp> = txn.all_where(|_| true).unwrap();
        let second = reconcile_set(&mut txn, &sink, existing, candidates, "").unwrap();
        assert_eq!(second.changes(), 0);
        assert_eq!(second.kept, 2);
    }

    #[test]
    fn duplicate_candidates_collapse() {
        let mut store = MemStore::new();
        let sink = VecSink::new();
        let mut txn = store.begin().unwrap();
        let note = note_term(&mut txn);
        let candidates = vec![
            FeatureProp::new(id(1), note, "A", 0),
            FeatureProp::new(id(1), note, "A", 0),
        ];
        let report = reconcile_set(&mut txn, &sink, Vec::new(), candidates, "").unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(txn.count::<FeatureProp>().unwrap(), 1);
    }

    #[test]
    fn cross_reference_flag_updates_in_place() {
        let mut store = MemStore::new();
        let sink = VecSink::new();
        let mut txn = store.begin().unwrap();
        let db = txn.insert(Db::new("DB")).unwrap();
        let xref = txn.insert(DbxRef::new(db.id.unwrap(), "1")).unwrap().id.unwrap();
        let stored = txn.insert(FeatureDbxRef::new(id(1), xref, false)).unwrap();

        let report = reconcile_set(
            &mut txn,
            &sink,
            vec![stored.clone()],
            vec![FeatureDbxRef::new(id(1), xref, true)],
            "feature 'g1'",
        )
        .unwrap();

        assert_eq!((report.inserted, report.updated, report.deleted), (0, 1, 0));
        let reloaded: FeatureDbxRef = txn.get(stored.id.unwrap()).unwrap().unwrap();
        assert!(reloaded.is_current);
        assert_eq!(
            sink.lines(),
            vec!["Updated cross reference 'DB:1' for feature 'g1'"]
        );
    }

    #[test]
    fn term_with_other_publication_keeps_stored_attribution() {
        let mut store = MemStore::new();
        let sink = VecSink::new();
        let mut txn = store.begin().unwrap();
        let term = note_term(&mut txn);
        let first = txn.insert(Pub::new("PMID:1", id(1))).unwrap().id.unwrap();
        let second = txn.insert(Pub::new("PMID:2", id(1))).unwrap().id.unwrap();
        let stored = txn.insert(FeatureCvTerm::new(id(1), term, first)).unwrap();

        let report = reconcile_set(
            &mut txn,
            &sink,
            vec![stored.clone()],
            vec![FeatureCvTerm::new(id(1), term, second)],
            "feature 'g1'",
        )
        .unwrap();

        assert_eq!((report.inserted, report.kept, report.deleted), (0, 1, 0));
        let reloaded: FeatureCvTerm = txn.get(stored.id.unwrap()).unwrap().unwrap();
        assert_eq!(reloaded.pub_id, first);
        assert!(sink.is_empty());
    }

    #[test]
    fn empty_candidate_set_deletes_everything() {
        let mut store = MemStore::new();
        let sink = VecSink::new();
        let mut txn = store.begin().unwrap();
        let null_pub = txn.insert(Pub::new("null", id(1))).unwrap().id.unwrap();
        let mut existing = Vec::new();
        for name in ["alpha", "beta"] {
            let synonym = txn.insert(Synonym::new(name, id(1))).unwrap().id.unwrap();
            existing.push(txn.insert(FeatureSynonym::new(id(1), synonym, null_pub)).unwrap());
        }

        let report = reconcile_set(&mut txn, &sink, existing, Vec::new(), "feature 'g1'").unwrap();

        assert_eq!(report.deleted, 2);
        assert!(report.retained.is_empty());
        assert_eq!(txn.count::<FeatureSynonym>().unwrap(), 0);
        assert_eq!(
            sink.lines(),
            vec![
                "Deleted synonym 'alpha' for feature 'g1'",
                "Deleted synonym 'beta' for feature 'g1'",
            ]
        );
    }

    #[test]
    fn unpersisted_existing_rows_are_rejected() {
        let mut store = MemStore::new();
        let mut txn = store.begin().unwrap();
        let err = reconcile_set(
            &mut txn,
            &VecSink::new(),
            vec![FeatureDbxRef::new(id(1), id(2), true)],
            Vec::new(),
            "",
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Unpersisted { .. }));
    }
}
