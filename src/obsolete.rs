//! Soft deletion of features.
//!
//! Features are never removed; a stale feature gets `is_obsolete` set. The
//! flag is only ever raised here, never cleared.

use std::collections::BTreeSet;

use crate::audit::{self, AuditAction, AuditEvent, AuditSink};
use crate::error::LookupResult;
use crate::lookup::load_feature;
use crate::matcher::Singleton;
use crate::model::{Feature, Organism};
use crate::store::{RowStore, StoreResult, TypedStore};

/// Mark the feature `uniquename` of `organism` as obsolete.
///
/// A no-op (no audit line) if it already is. Fails with
/// [`FeatureNotFound`](crate::error::LookupError::FeatureNotFound) if the
/// feature does not exist.
pub fn mark_obsolete<S: RowStore + ?Sized>(
    store: &mut S,
    audit: &dyn AuditSink,
    organism: &Organism,
    uniquename: &str,
) -> LookupResult<Feature> {
    let mut feature = load_feature(store, organism, uniquename)?;
    flag(store, audit, &mut feature)?;
    Ok(feature)
}

/// Mark every feature of `organism` whose unique name is not in `present`
/// as obsolete. Returns the number of features newly marked.
///
/// Each stale row is flagged as scanned, so features sharing a unique name
/// across types are handled independently.
pub fn mark_absent_obsolete<'a, S, I>(
    store: &mut S,
    audit: &dyn AuditSink,
    organism: &Organism,
    present: I,
) -> LookupResult<usize>
where
    S: RowStore + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let present: BTreeSet<&str> = present.into_iter().collect();
    let stale = store.all_where(|f: &Feature| {
        Some(f.organism_id) == organism.id
            && !f.is_obsolete
            && !present.contains(f.uniquename.as_str())
    })?;
    let mut marked = 0;
    for mut feature in stale {
        if flag(store, audit, &mut feature)? {
            marked += 1;
        }
    }
    Ok(marked)
}

/// Raise the flag on a stored feature. Returns whether it changed.
fn flag<S: RowStore + ?Sized>(
    store: &mut S,
    audit: &dyn AuditSink,
    feature: &mut Feature,
) -> StoreResult<bool> {
    if feature.is_obsolete {
        return Ok(false);
    }
    feature.is_obsolete = true;
    store.update(&*feature)?;
    audit::emit(audit, AuditEvent::new(AuditAction::MarkedObsolete, feature.label(), ""));
    Ok(true)
}
