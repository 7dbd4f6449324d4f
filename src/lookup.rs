//! Resolution of reference entities by natural name.
//!
//! Vocabularies, terms, organisms, databases, cross references and
//! publications are read-only inputs of an import. A missing one is fatal
//! for the import unit and surfaces as [`LookupError::MissingReference`].

use std::collections::BTreeMap;

use crate::error::{LookupError, LookupResult};
use crate::model::{Cv, CvTerm, Db, DbxRef, Feature, Organism, Pub};
use crate::store::{RowStore, TypedStore};

pub fn load_cv<S: RowStore + ?Sized>(store: &S, name: &str) -> LookupResult<Cv> {
    store
        .first_where(|cv: &Cv| cv.name == name)?
        .ok_or_else(|| LookupError::missing("CV", name))
}

/// First term with the given name, in any vocabulary.
pub fn load_cvterm<S: RowStore + ?Sized>(store: &S, name: &str) -> LookupResult<CvTerm> {
    store
        .first_where(|term: &CvTerm| term.name == name)?
        .ok_or_else(|| LookupError::missing("CV term", name))
}

/// Terms of `vocabulary`, keyed by name.
///
/// Only relationship-type terms are returned when `relationship_types` is
/// set, only ordinary terms otherwise. Fails if the vocabulary or any of
/// `required` is absent.
pub fn load_cvterms<S: RowStore + ?Sized>(
    store: &S,
    vocabulary: &str,
    required: &[&str],
    relationship_types: bool,
) -> LookupResult<BTreeMap<String, CvTerm>> {
    let cv = load_cv(store, vocabulary)?;
    let terms = store.all_where(|term: &CvTerm| {
        Some(term.cv_id) == cv.id && term.is_relationshiptype == relationship_types
    })?;

    let mut by_name = BTreeMap::new();
    for term in terms {
        by_name.entry(term.name.clone()).or_insert(term);
    }
    if let Some(missing) = required.iter().find(|name| !by_name.contains_key(**name)) {
        return Err(LookupError::missing("CV term", *missing));
    }
    Ok(by_name)
}

pub fn load_pub<S: RowStore + ?Sized>(store: &S, uniquename: &str) -> LookupResult<Pub> {
    store
        .first_where(|p: &Pub| p.uniquename == uniquename)?
        .ok_or_else(|| LookupError::missing("Pub", uniquename))
}

pub fn load_organism<S: RowStore + ?Sized>(store: &S, abbreviation: &str) -> LookupResult<Organism> {
    store
        .first_where(|o: &Organism| o.abbreviation == abbreviation)?
        .ok_or_else(|| LookupError::missing("Organism", abbreviation))
}

pub fn load_db<S: RowStore + ?Sized>(store: &S, name: &str) -> LookupResult<Db> {
    store
        .first_where(|db: &Db| db.name == name)?
        .ok_or_else(|| LookupError::missing("DB", name))
}

pub fn load_dbxref<S: RowStore + ?Sized>(store: &S, db: &str, accession: &str) -> LookupResult<DbxRef> {
    let db = load_db(store, db)?;
    store
        .first_where(|x: &DbxRef| Some(x.db_id) == db.id && x.accession == accession)?
        .ok_or_else(|| LookupError::missing("DbxRef", format!("{}:{accession}", db.name)))
}

/// Resolve a cross reference written as `DB:ACCESSION`.
pub fn load_dbxref_by_curie<S: RowStore + ?Sized>(store: &S, curie: &str) -> LookupResult<DbxRef> {
    let (db, accession) = split_curie(curie)?;
    load_dbxref(store, db, accession)
}

/// Resolve an ontology term through its cross reference, e.g. `GO:0005634`.
pub fn load_cvterm_by_curie<S: RowStore + ?Sized>(store: &S, curie: &str) -> LookupResult<CvTerm> {
    let xref = match load_dbxref_by_curie(store, curie) {
        Err(LookupError::MissingReference { .. }) => return Err(LookupError::missing("CV term", curie)),
        other => other?,
    };
    store
        .first_where(|term: &CvTerm| Some(term.dbxref_id) == xref.id)?
        .ok_or_else(|| LookupError::missing("CV term", curie))
}

/// Split `DB:ACCESSION` at the first colon. Accessions may contain colons.
pub fn split_curie(curie: &str) -> LookupResult<(&str, &str)> {
    match curie.split_once(':') {
        Some((db, accession)) if !db.is_empty() && !accession.is_empty() => Ok((db, accession)),
        _ => Err(LookupError::MalformedCurie {
            curie: curie.to_string(),
        }),
    }
}

/// Unique names of all features of `organism`, in insertion order.
pub fn load_feature_names<S: RowStore + ?Sized>(
    store: &S,
    organism: &Organism,
) -> LookupResult<Vec<String>> {
    let features = store.all_where(|f: &Feature| Some(f.organism_id) == organism.id)?;
    Ok(features.into_iter().map(|f| f.uniquename).collect())
}

pub fn load_feature<S: RowStore + ?Sized>(
    store: &S,
    organism: &Organism,
    uniquename: &str,
) -> LookupResult<Feature> {
    store
        .first_where(|f: &Feature| Some(f.organism_id) == organism.id && f.uniquename == uniquename)?
        .ok_or_else(|| LookupError::FeatureNotFound {
            organism: organism.abbreviation.clone(),
            uniquename: uniquename.to_string(),
        })
}

/// Display names of referenced rows, for audit lines.
///
/// A dangling id renders as the id itself rather than failing.
pub mod names {
    use crate::model::{CvTerm, Db, DbxRef, Feature, Pub, RowId, Synonym};
    use crate::store::{RowStore, StoreResult, TypedStore};

    pub fn term<S: RowStore + ?Sized>(store: &S, id: RowId) -> StoreResult<String> {
        Ok(store
            .get::<CvTerm>(id)?
            .map_or_else(|| id.to_string(), |term| term.name))
    }

    pub fn curie<S: RowStore + ?Sized>(store: &S, id: RowId) -> StoreResult<String> {
        let Some(xref) = store.get::<DbxRef>(id)? else {
            return Ok(id.to_string());
        };
        let db = store
            .get::<Db>(xref.db_id)?
            .map_or_else(|| xref.db_id.to_string(), |db| db.name);
        Ok(format!("{db}:{}", xref.accession))
    }

    pub fn publication<S: RowStore + ?Sized>(store: &S, id: RowId) -> StoreResult<String> {
        Ok(store
            .get::<Pub>(id)?
            .map_or_else(|| id.to_string(), |p| p.uniquename))
    }

    pub fn synonym<S: RowStore + ?Sized>(store: &S, id: RowId) -> StoreResult<String> {
        Ok(store
            .get::<Synonym>(id)?
            .map_or_else(|| id.to_string(), |s| s.name))
    }

    pub fn feature<S: RowStore + ?Sized>(store: &S, id: RowId) -> StoreResult<String> {
        Ok(store
            .get::<Feature>(id)?
            .map_or_else(|| id.to_string(), |f| f.uniquename))
    }
}
