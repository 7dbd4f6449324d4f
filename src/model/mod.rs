//! Row types for the Chado tables the reconciler touches.
//!
//! Every persisted row carries a surrogate [`RowId`] assigned by the store on
//! insert. Candidates built by loaders have `id: None` until they are
//! inserted or matched against an existing row.

/// Implements [`Record`] for a struct with an `id: Option<RowId>` field.
macro_rules! record {
    ($ty:ty, $table:expr) => {
        impl $crate::model::Record for $ty {
            const TABLE: $crate::model::Table = $table;

            fn id(&self) -> Option<$crate::model::RowId> {
                self.id
            }

            fn set_id(&mut self, id: $crate::model::RowId) {
                self.id = Some(id);
            }
        }
    };
}

pub(crate) use record;

pub mod feature;
pub mod links;
pub mod publication;
pub mod reference;

use std::num::NonZeroU64;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use feature::{Feature, FeatureLoc};
pub use links::{
    FeatureCvTerm, FeatureDbxRef, FeatureProp, FeaturePub, FeatureRelationship, FeatureSynonym,
    Synonym,
};
pub use publication::Pub;
pub use reference::{Cv, CvTerm, Db, DbxRef, Organism};

/// Surrogate primary key of a stored row.
///
/// Uses `NonZeroU64` so that `Option<RowId>` costs nothing extra and zero
/// can never be mistaken for a real key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RowId(NonZeroU64);

impl RowId {
    /// Create a `RowId` from a raw `u64`. Returns `None` for zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(RowId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The tables of the fixed schema, one per entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Table {
    Organism,
    Cv,
    CvTerm,
    Db,
    DbxRef,
    Pub,
    Feature,
    FeatureLoc,
    FeatureProp,
    FeatureDbxRef,
    FeatureCvTerm,
    Synonym,
    FeatureSynonym,
    FeaturePub,
    FeatureRelationship,
}

impl Table {
    /// All tables, in dependency order.
    pub const ALL: [Table; 15] = [
        Table::Organism,
        Table::Cv,
        Table::Db,
        Table::DbxRef,
        Table::CvTerm,
        Table::Pub,
        Table::Feature,
        Table::FeatureLoc,
        Table::FeatureProp,
        Table::FeatureDbxRef,
        Table::FeatureCvTerm,
        Table::Synonym,
        Table::FeatureSynonym,
        Table::FeaturePub,
        Table::FeatureRelationship,
    ];

    /// Schema name of the table.
    pub fn name(self) -> &'static str {
        match self {
            Table::Organism => "organism",
            Table::Cv => "cv",
            Table::CvTerm => "cvterm",
            Table::Db => "db",
            Table::DbxRef => "dbxref",
            Table::Pub => "pub",
            Table::Feature => "feature",
            Table::FeatureLoc => "featureloc",
            Table::FeatureProp => "featureprop",
            Table::FeatureDbxRef => "feature_dbxref",
            Table::FeatureCvTerm => "feature_cvterm",
            Table::Synonym => "synonym",
            Table::FeatureSynonym => "feature_synonym",
            Table::FeaturePub => "feature_pub",
            Table::FeatureRelationship => "feature_relationship",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A row of one table of the schema.
pub trait Record: Clone + std::fmt::Debug + Serialize + DeserializeOwned + 'static {
    /// Table the row lives in.
    const TABLE: Table;

    /// Surrogate id, `None` for a candidate that was never persisted.
    fn id(&self) -> Option<RowId>;

    /// Assign the surrogate id (done by the store on insert).
    fn set_id(&mut self, id: RowId);

    /// Builder form of [`Record::set_id`].
    fn with_id(mut self, id: RowId) -> Self {
        self.set_id(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_id_rejects_zero() {
        assert!(RowId::new(0).is_none());
        assert_eq!(RowId::new(7).unwrap().get(), 7);
        assert_eq!(RowId::new(7).unwrap().to_string(), "#7");
    }

    #[test]
    fn table_names_are_unique() {
        let mut names: Vec<_> = Table::ALL.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Table::ALL.len());
    }
}
