//! Per-feature collections: properties, cross references, ontology terms,
//! synonyms, publications and relationships.
//!
//! Each link kind declares two signatures for [`Member`]:
//!
//! | kind                  | slot                 | full signature              |
//! |-----------------------|----------------------|-----------------------------|
//! | `FeatureProp`         | type                 | type, rank                  |
//! | `FeatureDbxRef`       | dbxref               | dbxref                      |
//! | `FeatureCvTerm`       | cvterm               | cvterm, pub, rank           |
//! | `FeatureSynonym`      | synonym              | synonym, pub                |
//! | `FeaturePub`          | pub                  | pub                         |
//! | `FeatureRelationship` | type, object         | type, object, rank          |

use serde::{Deserialize, Serialize};

use super::{RowId, Table, record};
use crate::diff::{Diffable, MutableField, mutable_fields};
use crate::lookup::names;
use crate::matcher::{Member, Singleton};
use crate::store::{RowStore, StoreResult};

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// A typed, ranked value attached to a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureProp {
    pub id: Option<RowId>,
    pub feature_id: RowId,
    pub type_id: RowId,
    pub value: Option<String>,
    pub rank: i32,
}

impl FeatureProp {
    pub fn new(feature_id: RowId, type_id: RowId, value: &str, rank: i32) -> Self {
        Self {
            id: None,
            feature_id,
            type_id,
            value: Some(value.to_string()),
            rank,
        }
    }
}

record!(FeatureProp, Table::FeatureProp);

impl Diffable for FeatureProp {
    // A different value goes to a fresh rank instead of overwriting.
    const MUTABLE_FIELDS: &'static [MutableField<Self>] = &[];
}

impl Member for FeatureProp {
    const NOUN: &'static str = "property";
    const RANKED: bool = true;

    fn parent(&self) -> RowId {
        self.feature_id
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.feature_id == other.feature_id && self.type_id == other.type_id
    }

    fn same_signature(&self, other: &Self) -> bool {
        self.same_slot(other) && self.rank == other.rank
    }

    fn rank(&self) -> i32 {
        self.rank
    }

    fn set_rank(&mut self, rank: i32) {
        self.rank = rank;
    }

    fn same_value(&self, other: &Self) -> bool {
        self.value == other.value
    }

    fn describe<S: RowStore + ?Sized>(&self, store: &S) -> StoreResult<String> {
        Ok(format!(
            "property '{}' = '{}'",
            names::term(store, self.type_id)?,
            self.value.as_deref().unwrap_or_default()
        ))
    }
}

// ---------------------------------------------------------------------------
// Cross references
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDbxRef {
    pub id: Option<RowId>,
    pub feature_id: RowId,
    pub dbxref_id: RowId,
    pub is_current: bool,
}

impl FeatureDbxRef {
    pub fn new(feature_id: RowId, dbxref_id: RowId, is_current: bool) -> Self {
        Self {
            id: None,
            feature_id,
            dbxref_id,
            is_current,
        }
    }
}

record!(FeatureDbxRef, Table::FeatureDbxRef);

impl Diffable for FeatureDbxRef {
    const MUTABLE_FIELDS: &'static [MutableField<Self>] = mutable_fields![FeatureDbxRef; is_current];
}

impl Member for FeatureDbxRef {
    const NOUN: &'static str = "cross reference";

    fn parent(&self) -> RowId {
        self.feature_id
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.feature_id == other.feature_id && self.dbxref_id == other.dbxref_id
    }

    fn same_signature(&self, other: &Self) -> bool {
        self.same_slot(other)
    }

    fn describe<S: RowStore + ?Sized>(&self, store: &S) -> StoreResult<String> {
        Ok(format!("cross reference '{}'", names::curie(store, self.dbxref_id)?))
    }
}

// ---------------------------------------------------------------------------
// Ontology terms
// ---------------------------------------------------------------------------

/// Annotation of a feature with an ontology term, attributed to a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCvTerm {
    pub id: Option<RowId>,
    pub feature_id: RowId,
    pub cvterm_id: RowId,
    pub pub_id: RowId,
    pub is_not: bool,
    pub rank: i32,
}

impl FeatureCvTerm {
    pub fn new(feature_id: RowId, cvterm_id: RowId, pub_id: RowId) -> Self {
        Self {
            id: None,
            feature_id,
            cvterm_id,
            pub_id,
            is_not: false,
            rank: 0,
        }
    }
}

record!(FeatureCvTerm, Table::FeatureCvTerm);

impl Diffable for FeatureCvTerm {
    const MUTABLE_FIELDS: &'static [MutableField<Self>] = &[];
}

impl Member for FeatureCvTerm {
    const NOUN: &'static str = "ontology term";

    fn parent(&self) -> RowId {
        self.feature_id
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.feature_id == other.feature_id && self.cvterm_id == other.cvterm_id
    }

    fn same_signature(&self, other: &Self) -> bool {
        self.same_slot(other) && self.pub_id == other.pub_id && self.rank == other.rank
    }

    fn describe<S: RowStore + ?Sized>(&self, store: &S) -> StoreResult<String> {
        Ok(format!("ontology term '{}'", names::term(store, self.cvterm_id)?))
    }
}

// ---------------------------------------------------------------------------
// Synonyms
// ---------------------------------------------------------------------------

/// A synonym name of a given synonym type, shared between features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synonym {
    pub id: Option<RowId>,
    pub name: String,
    pub type_id: RowId,
    pub synonym_sgml: String,
}

impl Synonym {
    pub fn new(name: impl Into<String>, type_id: RowId) -> Self {
        let name = name.into();
        Self {
            id: None,
            synonym_sgml: name.clone(),
            name,
            type_id,
        }
    }
}

record!(Synonym, Table::Synonym);

impl Diffable for Synonym {
    const MUTABLE_FIELDS: &'static [MutableField<Self>] = mutable_fields![Synonym; synonym_sgml];
}

impl Singleton for Synonym {
    const NOUN: &'static str = "synonym";

    fn same_key(&self, other: &Self) -> bool {
        self.name == other.name && self.type_id == other.type_id
    }

    fn label(&self) -> String {
        format!("synonym '{}'", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSynonym {
    pub id: Option<RowId>,
    pub synonym_id: RowId,
    pub feature_id: RowId,
    pub pub_id: RowId,
    pub is_current: bool,
    pub is_internal: bool,
}

impl FeatureSynonym {
    pub fn new(feature_id: RowId, synonym_id: RowId, pub_id: RowId) -> Self {
        Self {
            id: None,
            synonym_id,
            feature_id,
            pub_id,
            is_current: true,
            is_internal: false,
        }
    }
}

record!(FeatureSynonym, Table::FeatureSynonym);

impl Diffable for FeatureSynonym {
    const MUTABLE_FIELDS: &'static [MutableField<Self>] =
        mutable_fields![FeatureSynonym; is_internal, is_current];
}

impl Member for FeatureSynonym {
    const NOUN: &'static str = "synonym";

    fn parent(&self) -> RowId {
        self.feature_id
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.feature_id == other.feature_id && self.synonym_id == other.synonym_id
    }

    fn same_signature(&self, other: &Self) -> bool {
        self.same_slot(other) && self.pub_id == other.pub_id
    }

    fn describe<S: RowStore + ?Sized>(&self, store: &S) -> StoreResult<String> {
        Ok(format!("synonym '{}'", names::synonym(store, self.synonym_id)?))
    }
}

// ---------------------------------------------------------------------------
// Publications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePub {
    pub id: Option<RowId>,
    pub feature_id: RowId,
    pub pub_id: RowId,
}

impl FeaturePub {
    pub fn new(feature_id: RowId, pub_id: RowId) -> Self {
        Self {
            id: None,
            feature_id,
            pub_id,
        }
    }
}

record!(FeaturePub, Table::FeaturePub);

impl Diffable for FeaturePub {
    const MUTABLE_FIELDS: &'static [MutableField<Self>] = &[];
}

impl Member for FeaturePub {
    const NOUN: &'static str = "publication";

    fn parent(&self) -> RowId {
        self.feature_id
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.feature_id == other.feature_id && self.pub_id == other.pub_id
    }

    fn same_signature(&self, other: &Self) -> bool {
        self.same_slot(other)
    }

    fn describe<S: RowStore + ?Sized>(&self, store: &S) -> StoreResult<String> {
        Ok(format!("publication '{}'", names::publication(store, self.pub_id)?))
    }
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

/// Directed, typed edge from a subject feature to an object feature.
///
/// The subject is the owning feature of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRelationship {
    pub id: Option<RowId>,
    pub subject_id: RowId,
    pub object_id: RowId,
    pub type_id: RowId,
    pub value: Option<String>,
    pub rank: i32,
}

impl FeatureRelationship {
    pub fn new(subject_id: RowId, object_id: RowId, type_id: RowId) -> Self {
        Self {
            id: None,
            subject_id,
            object_id,
            type_id,
            value: None,
            rank: 0,
        }
    }
}

record!(FeatureRelationship, Table::FeatureRelationship);

impl Diffable for FeatureRelationship {
    const MUTABLE_FIELDS: &'static [MutableField<Self>] = mutable_fields![FeatureRelationship; value];
}

impl Member for FeatureRelationship {
    const NOUN: &'static str = "relationship";

    fn parent(&self) -> RowId {
        self.subject_id
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.subject_id == other.subject_id
            && self.type_id == other.type_id
            && self.object_id == other.object_id
    }

    fn same_signature(&self, other: &Self) -> bool {
        self.same_slot(other) && self.rank == other.rank
    }

    fn describe<S: RowStore + ?Sized>(&self, store: &S) -> StoreResult<String> {
        Ok(format!(
            "relationship '{}' '{}'",
            names::term(store, self.type_id)?,
            names::feature(store, self.object_id)?
        ))
    }
}
