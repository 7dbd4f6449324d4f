//! Sequence features and their genomic placement.

use serde::{Deserialize, Serialize};

use super::{RowId, Table, record};
use crate::diff::{Diffable, MutableField, mutable_fields};
use crate::matcher::Singleton;

/// A biological sequence feature (gene, transcript, contig, ...).
///
/// Identity key: `(organism_id, type_id, uniquename)`. Features are never
/// deleted by the reconciler; staleness is expressed through `is_obsolete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: Option<RowId>,
    pub organism_id: RowId,
    pub type_id: RowId,
    pub uniquename: String,
    pub dbxref_id: Option<RowId>,
    pub name: Option<String>,
    pub residues: Option<String>,
    /// Sequence length (`seqlen`).
    pub length: Option<u64>,
    /// MD5 checksum of the residues.
    pub checksum: Option<String>,
    pub is_analysis: bool,
    pub is_obsolete: bool,
}

impl Feature {
    pub fn new(organism_id: RowId, type_id: RowId, uniquename: impl Into<String>) -> Self {
        Self {
            id: None,
            organism_id,
            type_id,
            uniquename: uniquename.into(),
            dbxref_id: None,
            name: None,
            residues: None,
            length: None,
            checksum: None,
            is_analysis: false,
            is_obsolete: false,
        }
    }
}

record!(Feature, Table::Feature);

impl Diffable for Feature {
    const MUTABLE_FIELDS: &'static [MutableField<Self>] = mutable_fields![
        Feature;
        name, residues, length, checksum, is_analysis;
        // Raised, never cleared.
        MutableField::new(
            "is_obsolete",
            |existing: &Feature, candidate: &Feature| candidate.is_obsolete && !existing.is_obsolete,
            |existing: &mut Feature, candidate: &Feature| existing.is_obsolete |= candidate.is_obsolete,
        ),
    ];
}

impl Singleton for Feature {
    const NOUN: &'static str = "feature";

    fn same_key(&self, other: &Self) -> bool {
        self.organism_id == other.organism_id
            && self.type_id == other.type_id
            && self.uniquename == other.uniquename
    }

    fn label(&self) -> String {
        format!("feature '{}'", self.uniquename)
    }
}

/// Placement of a feature on a source feature.
///
/// At most one location per feature is reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLoc {
    pub id: Option<RowId>,
    pub feature_id: RowId,
    pub srcfeature_id: Option<RowId>,
    /// Interbase start coordinate (`fmin`).
    pub start: Option<i64>,
    /// Interbase end coordinate (`fmax`).
    pub end: Option<i64>,
    pub strand: Option<i16>,
    pub phase: Option<i32>,
    pub locgroup: i32,
    pub rank: i32,
}

impl FeatureLoc {
    pub fn new(feature_id: RowId, srcfeature_id: Option<RowId>, start: i64, end: i64) -> Self {
        Self {
            id: None,
            feature_id,
            srcfeature_id,
            start: Some(start),
            end: Some(end),
            strand: None,
            phase: None,
            locgroup: 0,
            rank: 0,
        }
    }
}

record!(FeatureLoc, Table::FeatureLoc);

impl Diffable for FeatureLoc {
    const MUTABLE_FIELDS: &'static [MutableField<Self>] =
        mutable_fields![FeatureLoc; start, end, strand, phase];
}

impl Singleton for FeatureLoc {
    const NOUN: &'static str = "featureloc";

    fn same_key(&self, other: &Self) -> bool {
        self.feature_id == other.feature_id
    }

    fn label(&self) -> String {
        "featureloc".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::apply_diff;
    use crate::model::Record;

    fn id(raw: u64) -> RowId {
        RowId::new(raw).unwrap()
    }

    #[test]
    fn feature_diff_leaves_identity_alone() {
        let mut existing = Feature::new(id(1), id(2), "gene1").with_id(id(9));
        existing.name = Some("abc1".into());

        let mut candidate = Feature::new(id(1), id(2), "gene1");
        candidate.name = Some("abc2".into());
        candidate.dbxref_id = Some(id(4));

        assert!(apply_diff(&mut existing, &candidate, Feature::MUTABLE_FIELDS));
        assert_eq!(existing.name.as_deref(), Some("abc2"));
        assert_eq!(existing.id, Some(id(9)));
        assert_eq!(existing.dbxref_id, None);
    }

    #[test]
    fn obsolete_flag_is_never_cleared() {
        let mut existing = Feature::new(id(1), id(2), "gene1");
        existing.is_obsolete = true;
        let candidate = Feature::new(id(1), id(2), "gene1");
        assert!(!apply_diff(&mut existing, &candidate, Feature::MUTABLE_FIELDS));
        assert!(existing.is_obsolete);

        let mut existing = Feature::new(id(1), id(2), "gene1");
        let mut candidate = existing.clone();
        candidate.is_obsolete = true;
        assert!(apply_diff(&mut existing, &candidate, Feature::MUTABLE_FIELDS));
        assert!(existing.is_obsolete);
    }

    #[test]
    fn location_diff_covers_coordinates_only() {
        let mut existing = FeatureLoc::new(id(1), Some(id(2)), 10, 20);
        let mut candidate = FeatureLoc::new(id(1), Some(id(3)), 10, 25);
        candidate.strand = Some(-1);
        assert!(apply_diff(&mut existing, &candidate, FeatureLoc::MUTABLE_FIELDS));
        assert_eq!(existing.end, Some(25));
        assert_eq!(existing.strand, Some(-1));
        assert_eq!(existing.srcfeature_id, Some(id(2)));
    }
}
