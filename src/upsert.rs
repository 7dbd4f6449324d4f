//! Upsert engine for entities with a unique natural key.

use crate::audit::{self, AuditAction, AuditEvent, AuditSink};
use crate::diff::{apply_diff, changed_fields};
use crate::matcher::{Singleton, find_persisted};
use crate::store::{RowStore, StoreResult, TypedStore};

/// What an upsert did to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

impl UpsertOutcome {
    /// Whether storage was written.
    pub fn is_effective(self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged)
    }
}

/// Insert `candidate` or bring its stored counterpart up to date.
///
/// The counterpart is found by natural key. Only the attributes listed in
/// the kind's mutable fields are copied onto it. `context` names the owner
/// for the audit line (e.g. `organism 'Pf'`) and may be empty.
///
/// Returns the stored row, which carries its surrogate id.
pub fn upsert<R, S>(
    store: &mut S,
    audit: &dyn AuditSink,
    candidate: R,
    context: &str,
) -> StoreResult<(R, UpsertOutcome)>
where
    R: Singleton,
    S: RowStore + ?Sized,
{
    match find_persisted(store, &candidate)? {
        None => {
            let stored = store.insert(candidate)?;
            tracing::debug!(table = %R::TABLE, id = ?stored.id(), "inserted");
            audit::emit(audit, AuditEvent::new(AuditAction::Inserted, stored.label(), context));
            Ok((stored, UpsertOutcome::Inserted))
        }
        Some(mut existing) => {
            let fields = changed_fields(&existing, &candidate, R::MUTABLE_FIELDS);
            if !apply_diff(&mut existing, &candidate, R::MUTABLE_FIELDS) {
                tracing::trace!(table = %R::TABLE, id = ?existing.id(), "unchanged");
                return Ok((existing, UpsertOutcome::Unchanged));
            }
            store.update(&existing)?;
            tracing::debug!(table = %R::TABLE, id = ?existing.id(), ?fields, "updated");
            audit::emit(audit, AuditEvent::new(AuditAction::Updated, existing.label(), context));
            Ok((existing, UpsertOutcome::Updated))
        }
    }
}
