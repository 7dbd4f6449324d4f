//! Reference entities: organisms, vocabularies, terms, databases and
//! database cross references.
//!
//! The reconciler only reads these; they are looked up by natural name and a
//! missing one aborts the import (see [`crate::lookup`]).

use serde::{Deserialize, Serialize};

use super::{RowId, Table, record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organism {
    pub id: Option<RowId>,
    pub genus: String,
    pub species: String,
    /// Natural key used by importers.
    pub abbreviation: String,
    pub common_name: Option<String>,
    pub infraspecific_name: Option<String>,
    pub comment: Option<String>,
}

impl Organism {
    pub fn new(genus: impl Into<String>, species: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        Self {
            id: None,
            genus: genus.into(),
            species: species.into(),
            abbreviation: abbreviation.into(),
            common_name: None,
            infraspecific_name: None,
            comment: None,
        }
    }
}

record!(Organism, Table::Organism);

/// A controlled vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cv {
    pub id: Option<RowId>,
    pub name: String,
    pub definition: Option<String>,
}

impl Cv {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            definition: None,
        }
    }
}

record!(Cv, Table::Cv);

/// A term of a controlled vocabulary, backed by one database cross reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvTerm {
    pub id: Option<RowId>,
    pub cv_id: RowId,
    pub dbxref_id: RowId,
    pub name: String,
    pub definition: Option<String>,
    pub is_obsolete: bool,
    pub is_relationshiptype: bool,
}

impl CvTerm {
    pub fn new(cv_id: RowId, dbxref_id: RowId, name: impl Into<String>) -> Self {
        Self {
            id: None,
            cv_id,
            dbxref_id,
            name: name.into(),
            definition: None,
            is_obsolete: false,
            is_relationshiptype: false,
        }
    }
}

record!(CvTerm, Table::CvTerm);

/// An external database (authority) such as `GO` or `PMID`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Db {
    pub id: Option<RowId>,
    pub name: String,
    pub description: Option<String>,
    pub urlprefix: Option<String>,
    pub url: Option<String>,
}

impl Db {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            urlprefix: None,
            url: None,
        }
    }
}

record!(Db, Table::Db);

/// An accession in an external database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbxRef {
    pub id: Option<RowId>,
    pub db_id: RowId,
    pub accession: String,
    pub version: String,
    pub description: Option<String>,
}

impl DbxRef {
    pub fn new(db_id: RowId, accession: impl Into<String>) -> Self {
        Self {
            id: None,
            db_id,
            accession: accession.into(),
            version: String::new(),
            description: None,
        }
    }
}

record!(DbxRef, Table::DbxRef);
