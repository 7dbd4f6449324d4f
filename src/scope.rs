//! Loading of the stored collections of a feature.
//!
//! An importer only reconciles the part of a collection it manages: the
//! properties of the types it writes, the ontology terms of the ontologies it
//! loads, and so on. Rows outside that scope are never handed to
//! [`reconcile_set`](crate::reconcile::reconcile_set) and therefore never
//! deleted.

use std::collections::BTreeSet;

use crate::model::{
    CvTerm, Db, DbxRef, FeatureCvTerm, FeatureDbxRef, FeatureProp, FeaturePub,
    FeatureRelationship, FeatureSynonym, RowId, Synonym,
};
use crate::store::{RowStore, StoreResult, TypedStore};

/// Properties of `feature` whose type is one of `types`.
pub fn properties<S: RowStore + ?Sized>(
    store: &S,
    feature: RowId,
    types: &BTreeSet<RowId>,
) -> StoreResult<Vec<FeatureProp>> {
    store.all_where(|p: &FeatureProp| p.feature_id == feature && types.contains(&p.type_id))
}

/// Relationships with `feature` as subject and a type from `types`.
pub fn relationships<S: RowStore + ?Sized>(
    store: &S,
    feature: RowId,
    types: &BTreeSet<RowId>,
) -> StoreResult<Vec<FeatureRelationship>> {
    store.all_where(|r: &FeatureRelationship| {
        r.subject_id == feature && types.contains(&r.type_id)
    })
}

/// Synonym links of `feature` whose synonym has a type from `types`.
pub fn synonyms<S: RowStore + ?Sized>(
    store: &S,
    feature: RowId,
    types: &BTreeSet<RowId>,
) -> StoreResult<Vec<FeatureSynonym>> {
    let in_scope: BTreeSet<RowId> = store
        .all_where(|s: &Synonym| types.contains(&s.type_id))?
        .into_iter()
        .filter_map(|s| s.id)
        .collect();
    store.all_where(|l: &FeatureSynonym| {
        l.feature_id == feature && in_scope.contains(&l.synonym_id)
    })
}

/// Ontology-term links of `feature` whose term belongs to one of the
/// databases named in `ontologies` (e.g. `GO`, `SO`).
pub fn ontology_terms<S: RowStore + ?Sized>(
    store: &S,
    feature: RowId,
    ontologies: &BTreeSet<String>,
) -> StoreResult<Vec<FeatureCvTerm>> {
    let dbs = ids(store.all_where(|db: &Db| ontologies.contains(&db.name))?, |db| db.id);
    let xrefs = ids(store.all_where(|x: &DbxRef| dbs.contains(&x.db_id))?, |x| x.id);
    let terms = ids(store.all_where(|t: &CvTerm| xrefs.contains(&t.dbxref_id))?, |t| t.id);
    store.all_where(|l: &FeatureCvTerm| l.feature_id == feature && terms.contains(&l.cvterm_id))
}

pub fn cross_references<S: RowStore + ?Sized>(
    store: &S,
    feature: RowId,
) -> StoreResult<Vec<FeatureDbxRef>> {
    store.all_where(|l: &FeatureDbxRef| l.feature_id == feature)
}

pub fn publications<S: RowStore + ?Sized>(store: &S, feature: RowId) -> StoreResult<Vec<FeaturePub>> {
    store.all_where(|l: &FeaturePub| l.feature_id == feature)
}

fn ids<R>(rows: Vec<R>, id: impl Fn(&R) -> Option<RowId>) -> BTreeSet<RowId> {
    rows.iter().filter_map(id).collect()
}
