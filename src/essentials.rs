//! Seeding of reference data.
//!
//! Imports never create organisms, vocabularies, terms, databases or
//! publications. This module loads them from a [`ReferenceSeed`] document
//! with find-or-insert semantics: rows that already exist are left exactly
//! as they are.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audit::{self, AuditAction, AuditEvent, AuditSink};
use crate::error::{InputError, StoreError, SyncResult};
use crate::lookup::split_curie;
use crate::model::{Cv, CvTerm, Db, DbxRef, Organism, Pub, Record, RowId};
use crate::store::{RowStore, StoreResult, TypedStore};

/// Vocabulary holding publication types.
pub const PUB_TYPE_CV: &str = "pub_type";

/// Reference data to make available before importing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceSeed {
    pub organisms: Vec<OrganismSeed>,
    /// Database names.
    pub dbs: Vec<String>,
    /// Cross references as `DB:ACCESSION`; the database is created on demand.
    pub dbxrefs: Vec<String>,
    pub cvs: Vec<CvSeed>,
    pub publications: Vec<PubSeed>,
}

impl ReferenceSeed {
    /// Read a JSON seed document.
    pub fn from_path(path: &Path) -> Result<Self, InputError> {
        let content = std::fs::read_to_string(path).map_err(|e| InputError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| InputError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganismSeed {
    pub genus: String,
    pub species: String,
    pub abbreviation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvSeed {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    /// Database backing the terms' cross references. Defaults to the
    /// vocabulary name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    #[serde(default)]
    pub terms: Vec<TermSeed>,
    /// Whether the terms are relationship types.
    #[serde(default)]
    pub relationship_types: bool,
}

/// A term, either just its name or with accession and definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermSeed {
    Name(String),
    Full {
        name: String,
        /// Defaults to the term name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accession: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        definition: Option<String>,
    },
}

impl TermSeed {
    pub fn name(&self) -> &str {
        match self {
            TermSeed::Name(name) | TermSeed::Full { name, .. } => name,
        }
    }

    fn accession(&self) -> &str {
        match self {
            TermSeed::Full {
                accession: Some(accession),
                ..
            } => accession,
            _ => self.name(),
        }
    }

    fn definition(&self) -> Option<&str> {
        match self {
            TermSeed::Full { definition, .. } => definition.as_deref(),
            TermSeed::Name(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubSeed {
    pub uniquename: String,
    /// Publication type, a term of the `pub_type` vocabulary (created on demand).
    #[serde(rename = "type")]
    pub pub_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

/// Rows created versus found by a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub existing: usize,
}

struct Seeder<'s, S: ?Sized> {
    store: &'s mut S,
    audit: &'s dyn AuditSink,
    report: SeedReport,
}

impl<S: RowStore + ?Sized> Seeder<'_, S> {
    fn find_or_insert<R: Record>(
        &mut self,
        candidate: R,
        same: impl Fn(&R) -> bool,
        label: impl FnOnce() -> String,
    ) -> StoreResult<RowId> {
        let row = match self.store.first_where(same)? {
            Some(row) => {
                self.report.existing += 1;
                row
            }
            None => {
                let row = self.store.insert(candidate)?;
                self.report.inserted += 1;
                audit::emit(self.audit, AuditEvent::new(AuditAction::Inserted, label(), ""));
                row
            }
        };
        row.id().ok_or(StoreError::Unpersisted { table: R::TABLE })
    }

    fn db(&mut self, name: &str) -> StoreResult<RowId> {
        self.find_or_insert(Db::new(name), |db: &Db| db.name == name, || format!("db '{name}'"))
    }

    fn dbxref(&mut self, db_name: &str, accession: &str) -> StoreResult<RowId> {
        let db_id = self.db(db_name)?;
        self.find_or_insert(
            DbxRef::new(db_id, accession),
            |x: &DbxRef| x.db_id == db_id && x.accession == accession,
            || format!("dbxref '{db_name}:{accession}'"),
        )
    }

    fn cv(&mut self, name: &str, definition: Option<&str>) -> StoreResult<RowId> {
        let mut cv = Cv::new(name);
        cv.definition = definition.map(str::to_string);
        self.find_or_insert(
            cv,
            |cv: &Cv| cv.name == name,
            || format!("controlled vocabulary '{name}'"),
        )
    }

    fn cvterm(
        &mut self,
        cv_id: RowId,
        db_name: &str,
        term: &TermSeed,
        relationship: bool,
    ) -> StoreResult<RowId> {
        let dbxref_id = self.dbxref(db_name, term.accession())?;
        let name = term.name();
        let mut candidate = CvTerm::new(cv_id, dbxref_id, name);
        candidate.definition = term.definition().map(str::to_string);
        candidate.is_relationshiptype = relationship;
        self.find_or_insert(
            candidate,
            |t: &CvTerm| t.cv_id == cv_id && t.name == name && t.is_relationshiptype == relationship,
            || format!("CV term '{name}'"),
        )
    }
}

/// Find or insert every entity of `seed`.
pub fn seed<S: RowStore + ?Sized>(
    store: &mut S,
    audit: &dyn AuditSink,
    seed: &ReferenceSeed,
) -> SyncResult<SeedReport> {
    let mut seeder = Seeder {
        store,
        audit,
        report: SeedReport::default(),
    };

    for org in &seed.organisms {
        let mut candidate = Organism::new(&*org.genus, &*org.species, &*org.abbreviation);
        candidate.common_name = org.common_name.clone();
        seeder.find_or_insert(
            candidate,
            |o: &Organism| o.abbreviation == org.abbreviation,
            || format!("organism '{}'", org.abbreviation),
        )?;
    }

    for name in &seed.dbs {
        seeder.db(name)?;
    }

    for curie in &seed.dbxrefs {
        let (db, accession) = split_curie(curie)?;
        seeder.dbxref(db, accession)?;
    }

    for cv in &seed.cvs {
        let cv_id = seeder.cv(&cv.name, cv.definition.as_deref())?;
        let db_name = cv.db.as_deref().unwrap_or(&cv.name);
        for term in &cv.terms {
            seeder.cvterm(cv_id, db_name, term, cv.relationship_types)?;
        }
    }

    if !seed.publications.is_empty() {
        let cv_id = seeder.cv(PUB_TYPE_CV, None)?;
        for publication in &seed.publications {
            let type_term = TermSeed::Name(publication.pub_type.clone());
            let type_id = seeder.cvterm(cv_id, PUB_TYPE_CV, &type_term, false)?;
            let mut candidate = Pub::new(&*publication.uniquename, type_id);
            candidate.title = publication.title.clone();
            candidate.year = publication.year.clone();
            seeder.find_or_insert(
                candidate,
                |p: &Pub| p.uniquename == publication.uniquename && p.type_id == type_id,
                || format!("publication '{}'", publication.uniquename),
            )?;
        }
    }

    tracing::info!(
        inserted = seeder.report.inserted,
        existing = seeder.report.existing,
        "seeded reference data"
    );
    Ok(seeder.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::VecSink;
    use crate::lookup;
    use crate::store::Backend;
    use crate::store::mem::MemStore;

    fn sample() -> ReferenceSeed {
        serde_json::from_str(
            r#"{
                "organisms": [{"genus": "Plasmodium", "species": "falciparum", "abbreviation": "Pf"}],
                "cvs": [
                    {"name": "sequence", "db": "SO", "terms": [{"name": "gene", "accession": "0000704"}, "mRNA"]}
                ],
                "publications": [{"uniquename": "PMID:1", "type": "paper", "year": "2002"}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn seeding_twice_inserts_once() {
        let mut store = MemStore::new();
        let sink = VecSink::new();
        let mut txn = store.begin().unwrap();

        let first = seed(&mut txn, &sink, &sample()).unwrap();
        assert!(first.inserted > 0);
        assert_eq!(first.existing, 1); // the SO db, shared by both terms
        let lines = sink.len();

        let second = seed(&mut txn, &sink, &sample()).unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(sink.len(), lines);

        let gene = lookup::load_cvterm_by_curie(&txn, "SO:0000704").unwrap();
        assert_eq!(gene.name, "gene");
        assert!(lookup::load_pub(&txn, "PMID:1").is_ok());
        assert!(lookup::load_organism(&txn, "Pf").is_ok());
    }

    #[test]
    fn audit_lines_name_inserted_entities() {
        let mut store = MemStore::new();
        let sink = VecSink::new();
        let mut txn = store.begin().unwrap();
        seed(&mut txn, &sink, &sample()).unwrap();
        let lines = sink.lines();
        assert_eq!(lines[0], "Inserted organism 'Pf'");
        assert!(lines.contains(&"Inserted controlled vocabulary 'sequence'".to_string()));
        assert!(lines.contains(&"Inserted dbxref 'SO:0000704'".to_string()));
        assert!(lines.contains(&"Inserted CV term 'mRNA'".to_string()));
    }
}
