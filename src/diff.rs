//! Property differ: copies changed allow-listed attributes onto an existing row.
//!
//! Each entity kind declares a fixed table of [`MutableField`]s (one
//! comparator/copier pair per attribute). Attributes outside the table are
//! never read or written, so identity keys and foreign keys of an existing
//! row survive a diff untouched.

/// One allow-listed attribute of a row type.
pub struct MutableField<R> {
    name: &'static str,
    differs: fn(&R, &R) -> bool,
    copy: fn(&mut R, &R),
}

impl<R> MutableField<R> {
    pub const fn new(name: &'static str, differs: fn(&R, &R) -> bool, copy: fn(&mut R, &R)) -> Self {
        Self {
            name,
            differs,
            copy,
        }
    }

    /// Attribute name as it appears in the schema.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether `existing` and `candidate` disagree on this attribute.
    pub fn differs(&self, existing: &R, candidate: &R) -> bool {
        (self.differs)(existing, candidate)
    }
}

impl<R> std::fmt::Debug for MutableField<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MutableField").field(&self.name).finish()
    }
}

/// Row types with a fixed list of attributes that reconciliation may overwrite.
pub trait Diffable: Sized + 'static {
    const MUTABLE_FIELDS: &'static [MutableField<Self>];
}

/// Builds a `&'static [MutableField<T>]` from plain field names.
///
/// Values are compared with `!=` and copied with `clone()`; `None` on the
/// candidate side is a value like any other.
///
/// Hand-written fields with their own semantics can follow a second `;`.
macro_rules! mutable_fields {
    ($ty:ty; $($field:ident),+ $(,)?) => {
        $crate::diff::mutable_fields![$ty; $($field),+ ;]
    };
    ($ty:ty; $($field:ident),+ ; $($extra:expr),* $(,)?) => {
        &[
            $(
                $crate::diff::MutableField::new(
                    stringify!($field),
                    |existing: &$ty, candidate: &$ty| existing.$field != candidate.$field,
                    |existing: &mut $ty, candidate: &$ty| existing.$field = candidate.$field.clone(),
                ),
            )+
            $($extra),*
        ]
    };
}

pub(crate) use mutable_fields;

/// Copy every field of `fields` that differs from `candidate` onto `existing`.
///
/// Returns `true` iff at least one value was copied.
pub fn apply_diff<R>(existing: &mut R, candidate: &R, fields: &[MutableField<R>]) -> bool {
    let mut changed = false;
    for field in fields {
        if field.differs(existing, candidate) {
            (field.copy)(existing, candidate);
            changed = true;
        }
    }
    changed
}

/// Names of the fields in `fields` on which the two rows disagree.
pub fn changed_fields<R>(existing: &R, candidate: &R, fields: &[MutableField<R>]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|f| f.differs(existing, candidate))
        .map(MutableField::name)
        .collect()
}
