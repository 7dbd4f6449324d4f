use std::collections::{BTreeMap, BTreeSet};

use chado_sync::audit::SilentSink;
use chado_sync::model::{FeatureDbxRef, FeatureProp, RowId};
use chado_sync::reconcile::reconcile_set;
use chado_sync::store::mem::MemStore;
use chado_sync::store::{Backend, TypedStore};
use proptest::prelude::*;

fn id(raw: u64) -> RowId {
    RowId::new(raw).unwrap()
}

const FEATURE: u64 = 1;

fn values() -> impl Strategy<Value = Vec<(u64, String)>> {
    // Few types and values so that collisions are common.
    proptest::collection::vec((1u64..=3, "[a-d]"), 0..8)
}

/// Property candidates ranked per type in input order.
fn props(values: &[(u64, String)]) -> Vec<FeatureProp> {
    let mut next: BTreeMap<u64, i32> = BTreeMap::new();
    values
        .iter()
        .map(|(type_id, value)| {
            let rank = next.entry(*type_id).or_insert(0);
            let prop = FeatureProp::new(id(FEATURE), id(*type_id), value, *rank);
            *rank += 1;
            prop
        })
        .collect()
}

fn stored_props<S: TypedStore>(store: &S) -> Vec<FeatureProp> {
    store.all_where(|p: &FeatureProp| p.feature_id == id(FEATURE)).unwrap()
}

fn xrefs(flags: &BTreeMap<u64, bool>) -> Vec<FeatureDbxRef> {
    flags
        .iter()
        .map(|(xref, current)| FeatureDbxRef::new(id(FEATURE), id(*xref), *current))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn ranks_never_collide_and_every_value_lands(before in values(), after in values()) {
        let mut store = MemStore::new();
        let mut txn = store.begin().unwrap();
        reconcile_set(&mut txn, &SilentSink, Vec::new(), props(&before), "").unwrap();

        let existing = stored_props(&txn);
        let report = reconcile_set(&mut txn, &SilentSink, existing.clone(), props(&after), "").unwrap();
        let rows = stored_props(&txn);

        let mut slots = BTreeSet::new();
        for row in &rows {
            prop_assert!(slots.insert((row.type_id, row.rank)), "duplicate slot {:?}", row);
        }
        for (type_id, value) in &after {
            prop_assert!(rows.iter().any(|r| r.type_id == id(*type_id) && r.value.as_deref() == Some(value)));
        }
        prop_assert_eq!(report.retained.len(), rows.len());
        prop_assert_eq!(existing.len() + report.inserted - report.deleted, rows.len());
    }

    #[test]
    fn deleted_rows_match_no_candidate(before in values(), after in values()) {
        let mut store = MemStore::new();
        let mut txn = store.begin().unwrap();
        reconcile_set(&mut txn, &SilentSink, Vec::new(), props(&before), "").unwrap();

        let existing = stored_props(&txn);
        let candidates = props(&after);
        reconcile_set(&mut txn, &SilentSink, existing.clone(), candidates.clone(), "").unwrap();
        let rows = stored_props(&txn);

        for old in &existing {
            if rows.iter().any(|r| r.id == old.id) {
                continue;
            }
            let claimed = candidates.iter().any(|c| {
                c.type_id == old.type_id && (c.value == old.value || c.rank == old.rank)
            });
            prop_assert!(!claimed, "deleted {:?} although a candidate claims it", old);
        }
    }

    #[test]
    fn second_pass_with_same_candidates_changes_nothing(before in values(), after in values()) {
        let mut store = MemStore::new();
        let mut txn = store.begin().unwrap();
        reconcile_set(&mut txn, &SilentSink, Vec::new(), props(&before), "").unwrap();
        let existing = stored_props(&txn);
        reconcile_set(&mut txn, &SilentSink, existing, props(&after), "").unwrap();

        let settled = stored_props(&txn);
        let report = reconcile_set(&mut txn, &SilentSink, settled.clone(), props(&after), "").unwrap();
        prop_assert_eq!(report.changes(), 0);
        prop_assert_eq!(stored_props(&txn), settled);
    }

    #[test]
    fn cross_references_converge_on_candidates(
        before in proptest::collection::btree_map(1u64..=6, any::<bool>(), 0..6),
        after in proptest::collection::btree_map(1u64..=6, any::<bool>(), 0..6),
    ) {
        let mut store = MemStore::new();
        let mut txn = store.begin().unwrap();
        reconcile_set(&mut txn, &SilentSink, Vec::new(), xrefs(&before), "").unwrap();

        let existing: Vec<FeatureDbxRef> = txn.all_where(|_| true).unwrap();
        let report = reconcile_set(&mut txn, &SilentSink, existing, xrefs(&after), "").unwrap();

        let rows: Vec<FeatureDbxRef> = txn.all_where(|_| true).unwrap();
        let landed: BTreeMap<u64, bool> = rows.iter().map(|r| (r.dbxref_id.get(), r.is_current)).collect();
        prop_assert_eq!(rows.len(), landed.len());
        prop_assert_eq!(&landed, &after);

        let flipped = after.iter().filter(|(k, v)| before.get(k).is_some_and(|old| old != *v)).count();
        let added = after.keys().filter(|k| !before.contains_key(k)).count();
        let removed = before.keys().filter(|k| !after.contains_key(k)).count();
        prop_assert_eq!((report.updated, report.inserted, report.deleted), (flipped, added, removed));
    }
}
