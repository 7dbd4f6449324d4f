//! Feature-level import: the transaction boundary around the reconciler.
//!
//! An [`ImportSession`] owns one store transaction for the duration of
//! [`ImportSession::run`]. Candidates arrive as name-based [`FeatureInput`]s
//! (produced by an upstream format loader), are resolved against reference
//! data, and are written in dependency order:
//!
//! 1. the feature itself,
//! 2. its synonyms,
//! 3. its location,
//! 4. its collections: properties, cross references, ontology terms,
//!    synonym links, publications and relationships.
//!
//! Any error rolls the whole transaction back.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audit::AuditSink;
use crate::config::VocabularyConfig;
use crate::error::{InputError, LookupError, StoreError, SyncResult};
use crate::lookup;
use crate::matcher::Singleton;
use crate::model::{
    CvTerm, Feature, FeatureCvTerm, FeatureDbxRef, FeatureLoc, FeatureProp, FeaturePub,
    FeatureRelationship, FeatureSynonym, Organism, RowId, Synonym, Table,
};
use crate::obsolete;
use crate::reconcile::{SetReport, reconcile_set};
use crate::scope;
use crate::store::Transaction;
use crate::upsert::{UpsertOutcome, upsert};

// ── Input ───────────────────────────────────────────────────────────────

/// One feature as delivered by a format loader. All references are by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureInput {
    pub uniquename: String,
    /// Feature type, a term of the feature-type vocabulary.
    #[serde(rename = "type")]
    pub feature_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residues: Option<String>,
    /// Sequence length; derived from `residues` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default)]
    pub is_analysis: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationInput>,
    #[serde(default)]
    pub properties: Vec<PropertyInput>,
    /// Cross references as `DB:ACCESSION`.
    #[serde(default)]
    pub cross_references: Vec<String>,
    #[serde(default)]
    pub terms: Vec<TermInput>,
    #[serde(default)]
    pub synonyms: Vec<SynonymInput>,
    /// Publication unique names.
    #[serde(default)]
    pub publications: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<RelationshipInput>,
}

impl FeatureInput {
    pub fn new(uniquename: impl Into<String>, feature_type: impl Into<String>) -> Self {
        Self {
            uniquename: uniquename.into(),
            feature_type: feature_type.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInput {
    /// Unique name of the source feature (contig, chromosome).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srcfeature: Option<String>,
    pub start: i64,
    pub end: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strand: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInput {
    #[serde(rename = "type")]
    pub property_type: String,
    pub value: String,
}

impl PropertyInput {
    pub fn new(property_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property_type: property_type.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermInput {
    /// Term accession, e.g. `GO:0005634`.
    pub curie: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    #[serde(default)]
    pub is_not: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymInput {
    pub name: String,
    /// Synonym type, a term of the synonym-type vocabulary.
    #[serde(rename = "type")]
    pub synonym_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    #[serde(default = "default_true")]
    pub is_current: bool,
    #[serde(default)]
    pub is_internal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipInput {
    #[serde(rename = "type")]
    pub relationship_type: String,
    /// Unique name of the object feature, of the same organism.
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Read a batch file: a JSON array of [`FeatureInput`]s.
pub fn read_batch(path: &Path) -> Result<Vec<FeatureInput>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|e| InputError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| InputError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

// ── Statistics ──────────────────────────────────────────────────────────

/// Effective changes made by one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub obsoleted: usize,
}

impl ImportStats {
    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    fn absorb<R>(&mut self, report: &SetReport<R>) {
        self.inserted += report.inserted;
        self.updated += report.updated;
        self.unchanged += report.kept;
        self.deleted += report.deleted;
    }

    /// Number of effective changes.
    pub fn changes(&self) -> usize {
        self.inserted + self.updated + self.deleted + self.obsoleted
    }
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} unchanged, {} deleted, {} marked obsolete",
            self.inserted, self.updated, self.unchanged, self.deleted, self.obsoleted
        )
    }
}

// ── Session ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Vocabulary {
    FeatureTypes,
    Properties,
    Relationships,
    SynonymTypes,
}

/// One import unit running inside a single store transaction.
pub struct ImportSession<'a, T: Transaction> {
    txn: T,
    audit: &'a dyn AuditSink,
    vocabularies: &'a VocabularyConfig,
    terms: BTreeMap<Vocabulary, BTreeMap<String, CvTerm>>,
    stats: ImportStats,
}

impl<'a, T: Transaction> ImportSession<'a, T> {
    /// Run `body` inside `txn`: commit if it succeeds, roll back otherwise.
    pub fn run<O>(
        txn: T,
        audit: &'a dyn AuditSink,
        vocabularies: &'a VocabularyConfig,
        body: impl FnOnce(&mut Self) -> SyncResult<O>,
    ) -> SyncResult<(O, ImportStats)> {
        let mut session = Self {
            txn,
            audit,
            vocabularies,
            terms: BTreeMap::new(),
            stats: ImportStats::default(),
        };
        match body(&mut session) {
            Ok(output) => {
                let stats = session.stats;
                session.txn.commit()?;
                tracing::info!(%stats, "import committed");
                Ok((output, stats))
            }
            Err(error) => {
                if let Err(rollback) = session.txn.rollback() {
                    tracing::warn!(%rollback, "rollback after failed import also failed");
                }
                tracing::info!(%error, "import rolled back");
                Err(error)
            }
        }
    }

    /// The underlying transaction.
    pub fn store(&mut self) -> &mut T {
        &mut self.txn
    }

    pub fn audit(&self) -> &'a dyn AuditSink {
        self.audit
    }

    /// Changes made so far.
    pub fn stats(&self) -> ImportStats {
        self.stats
    }

    pub fn organism(&self, abbreviation: &str) -> SyncResult<Organism> {
        Ok(lookup::load_organism(&self.txn, abbreviation)?)
    }

    /// Mark one feature as obsolete.
    pub fn mark_obsolete(&mut self, organism: &Organism, uniquename: &str) -> SyncResult<Feature> {
        let was_obsolete = lookup::load_feature(&self.txn, organism, uniquename)?.is_obsolete;
        let feature = obsolete::mark_obsolete(&mut self.txn, self.audit, organism, uniquename)?;
        if !was_obsolete {
            self.stats.obsoleted += 1;
        }
        Ok(feature)
    }

    /// Import one feature with all its collections.
    pub fn import_feature(&mut self, organism: &Organism, input: &FeatureInput) -> SyncResult<Feature> {
        let feature = self.import_body(organism, input)?;
        self.import_relationships(organism, &feature, input)?;
        Ok(feature)
    }

    /// Import every feature of `inputs`, in order.
    ///
    /// Relationships are reconciled after all features exist, so an object
    /// may appear later in the batch than its subject. With
    /// `obsolete_absent`, features of `organism` missing from the batch are
    /// marked obsolete.
    pub fn import_batch(
        &mut self,
        organism: &Organism,
        inputs: &[FeatureInput],
        obsolete_absent: bool,
    ) -> SyncResult<Vec<Feature>> {
        let mut features = Vec::with_capacity(inputs.len());
        for input in inputs {
            features.push(self.import_body(organism, input)?);
        }
        for (feature, input) in features.iter().zip(inputs) {
            self.import_relationships(organism, feature, input)?;
        }
        if obsolete_absent {
            let present = inputs.iter().map(|input| input.uniquename.as_str());
            let marked = obsolete::mark_absent_obsolete(&mut self.txn, self.audit, organism, present)?;
            self.stats.obsoleted += marked;
        }
        tracing::debug!(organism = %organism.abbreviation, features = inputs.len(), "imported batch");
        Ok(features)
    }

    fn import_body(&mut self, organism: &Organism, input: &FeatureInput) -> SyncResult<Feature> {
        let organism_id = organism
            .id
            .ok_or(StoreError::Unpersisted { table: Table::Organism })?;
        let type_id = self.term_id(Vocabulary::FeatureTypes, &input.feature_type)?;

        let mut candidate = Feature::new(organism_id, type_id, input.uniquename.as_str());
        candidate.name = input.name.clone();
        candidate.residues = input.residues.clone();
        candidate.length = input
            .length
            .or_else(|| input.residues.as_ref().map(|r| r.len() as u64));
        candidate.checksum = input.checksum.clone();
        candidate.is_analysis = input.is_analysis;

        let org_context = format!("organism '{}'", organism.abbreviation);
        let (feature, outcome) = upsert(&mut self.txn, self.audit, candidate, &org_context)?;
        self.stats.record(outcome);
        let feature_id = feature.id.ok_or(StoreError::Unpersisted { table: Table::Feature })?;
        let context = feature.label();

        let synonym_links = self.upsert_synonyms(feature_id, input)?;

        if let Some(location) = &input.location {
            let srcfeature_id = match &location.srcfeature {
                Some(name) => lookup::load_feature(&self.txn, organism, name)?.id,
                None => None,
            };
            let mut loc = FeatureLoc::new(feature_id, srcfeature_id, location.start, location.end);
            loc.strand = location.strand;
            loc.phase = location.phase;
            let (_, outcome) = upsert(&mut self.txn, self.audit, loc, &context)?;
            self.stats.record(outcome);
        }

        let properties = self.property_candidates(feature_id, input)?;
        let in_scope = self.scope(Vocabulary::Properties)?;
        let existing = scope::properties(&self.txn, feature_id, &in_scope)?;
        let report = reconcile_set(&mut self.txn, self.audit, existing, properties, &context)?;
        self.stats.absorb(&report);

        let mut xrefs = Vec::with_capacity(input.cross_references.len());
        for curie in &input.cross_references {
            let xref = lookup::load_dbxref_by_curie(&self.txn, curie)?;
            let xref_id = xref.id.ok_or(StoreError::Unpersisted { table: Table::DbxRef })?;
            xrefs.push(FeatureDbxRef::new(feature_id, xref_id, true));
        }
        let existing = scope::cross_references(&self.txn, feature_id)?;
        let report = reconcile_set(&mut self.txn, self.audit, existing, xrefs, &context)?;
        self.stats.absorb(&report);

        let ontologies: BTreeSet<String> = self.vocabularies.ontologies.iter().cloned().collect();
        let mut terms = Vec::with_capacity(input.terms.len());
        for term in &input.terms {
            let cvterm = lookup::load_cvterm_by_curie(&self.txn, &term.curie)?;
            // Only links of managed databases are loaded back as existing.
            let (db, _) = lookup::split_curie(&term.curie)?;
            if !ontologies.contains(db) {
                return Err(LookupError::UnmanagedOntology {
                    curie: term.curie.clone(),
                    db: db.to_string(),
                }
                .into());
            }
            let cvterm_id = cvterm.id.ok_or(StoreError::Unpersisted { table: Table::CvTerm })?;
            let pub_id = self.pub_id(term.publication.as_deref())?;
            let mut link = FeatureCvTerm::new(feature_id, cvterm_id, pub_id);
            link.is_not = term.is_not;
            terms.push(link);
        }
        let existing = scope::ontology_terms(&self.txn, feature_id, &ontologies)?;
        let report = reconcile_set(&mut self.txn, self.audit, existing, terms, &context)?;
        self.stats.absorb(&report);

        let in_scope = self.scope(Vocabulary::SynonymTypes)?;
        let existing = scope::synonyms(&self.txn, feature_id, &in_scope)?;
        let report = reconcile_set(&mut self.txn, self.audit, existing, synonym_links, &context)?;
        self.stats.absorb(&report);

        let mut pubs = Vec::with_capacity(input.publications.len());
        for uniquename in &input.publications {
            pubs.push(FeaturePub::new(feature_id, self.pub_id(Some(uniquename))?));
        }
        let existing = scope::publications(&self.txn, feature_id)?;
        let report = reconcile_set(&mut self.txn, self.audit, existing, pubs, &context)?;
        self.stats.absorb(&report);

        tracing::debug!(feature = %feature.uniquename, "imported feature");
        Ok(feature)
    }

    fn import_relationships(
        &mut self,
        organism: &Organism,
        feature: &Feature,
        input: &FeatureInput,
    ) -> SyncResult<()> {
        let subject_id = feature.id.ok_or(StoreError::Unpersisted { table: Table::Feature })?;
        let mut candidates = Vec::with_capacity(input.relationships.len());
        for relationship in &input.relationships {
            let type_id = self.term_id(Vocabulary::Relationships, &relationship.relationship_type)?;
            let object = lookup::load_feature(&self.txn, organism, &relationship.object)?;
            let object_id = object.id.ok_or(StoreError::Unpersisted { table: Table::Feature })?;
            let mut candidate = FeatureRelationship::new(subject_id, object_id, type_id);
            candidate.value = relationship.value.clone();
            candidates.push(candidate);
        }
        let in_scope = self.scope(Vocabulary::Relationships)?;
        let existing = scope::relationships(&self.txn, subject_id, &in_scope)?;
        let report = reconcile_set(&mut self.txn, self.audit, existing, candidates, &feature.label())?;
        self.stats.absorb(&report);
        Ok(())
    }

    /// Upsert the synonyms of `input` and build the links to them.
    fn upsert_synonyms(
        &mut self,
        feature_id: RowId,
        input: &FeatureInput,
    ) -> SyncResult<Vec<FeatureSynonym>> {
        let mut links = Vec::with_capacity(input.synonyms.len());
        for synonym in &input.synonyms {
            let type_id = self.term_id(Vocabulary::SynonymTypes, &synonym.synonym_type)?;
            let candidate = Synonym::new(synonym.name.as_str(), type_id);
            let (stored, outcome) = upsert(&mut self.txn, self.audit, candidate, "")?;
            self.stats.record(outcome);
            let synonym_id = stored.id.ok_or(StoreError::Unpersisted { table: Table::Synonym })?;
            let pub_id = self.pub_id(synonym.publication.as_deref())?;
            let mut link = FeatureSynonym::new(feature_id, synonym_id, pub_id);
            link.is_current = synonym.is_current;
            link.is_internal = synonym.is_internal;
            links.push(link);
        }
        Ok(links)
    }

    /// Property candidates, ranked per type in input order.
    fn property_candidates(
        &mut self,
        feature_id: RowId,
        input: &FeatureInput,
    ) -> SyncResult<Vec<FeatureProp>> {
        let mut next_rank: BTreeMap<RowId, i32> = BTreeMap::new();
        let mut properties = Vec::with_capacity(input.properties.len());
        for property in &input.properties {
            let type_id = self.term_id(Vocabulary::Properties, &property.property_type)?;
            let rank = next_rank.entry(type_id).or_insert(0);
            properties.push(FeatureProp::new(feature_id, type_id, &property.value, *rank));
            *rank += 1;
        }
        Ok(properties)
    }

    fn pub_id(&self, uniquename: Option<&str>) -> SyncResult<RowId> {
        let name = uniquename.unwrap_or(&self.vocabularies.default_publication);
        let publication = lookup::load_pub(&self.txn, name)?;
        Ok(publication.id.ok_or(StoreError::Unpersisted { table: Table::Pub })?)
    }

    fn vocabulary(&mut self, which: Vocabulary) -> SyncResult<&BTreeMap<String, CvTerm>> {
        if !self.terms.contains_key(&which) {
            let (name, relationship_types) = match which {
                Vocabulary::FeatureTypes => (&self.vocabularies.feature_types, false),
                Vocabulary::Properties => (&self.vocabularies.feature_properties, false),
                Vocabulary::Relationships => (&self.vocabularies.relationships, true),
                Vocabulary::SynonymTypes => (&self.vocabularies.synonym_types, false),
            };
            let terms = lookup::load_cvterms(&self.txn, name, &[], relationship_types)?;
            self.terms.insert(which, terms);
        }
        Ok(&self.terms[&which])
    }

    fn term_id(&mut self, which: Vocabulary, name: &str) -> SyncResult<RowId> {
        self.vocabulary(which)?
            .get(name)
            .and_then(|term| term.id)
            .ok_or_else(|| LookupError::missing("CV term", name).into())
    }

    /// Ids of every term of a vocabulary: the scope an import owns.
    fn scope(&mut self, which: Vocabulary) -> SyncResult<BTreeSet<RowId>> {
        Ok(self.vocabulary(which)?.values().filter_map(|term| term.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::VecSink;
    use crate::essentials::{self, ReferenceSeed};
    use crate::store::mem::MemStore;
    use crate::store::{Backend, TypedStore};

    fn seeded(store: &mut MemStore) {
        let seed: ReferenceSeed = serde_json::from_str(
            r#"{
                "organisms": [{"genus": "Plasmodium", "species": "falciparum", "abbreviation": "Pf"}],
                "dbs": ["GO"],
                "cvs": [
                    {"name": "sequence", "terms": ["gene", "mRNA", "contig"]},
                    {"name": "feature_property", "terms": ["note"]},
                    {"name": "relationship", "terms": ["part_of"], "relationship_types": true},
                    {"name": "synonym_type", "terms": ["synonym"]},
                    {"name": "biological_process", "db": "GO", "terms": [{"name": "translation", "accession": "0006412"}]}
                ],
                "publications": [{"uniquename": "null", "type": "unknown"}]
            }"#,
        )
        .unwrap();
        let txn = store.begin().unwrap();
        let vocab = VocabularyConfig::default();
        ImportSession::run(txn, &crate::audit::SilentSink, &vocab, |s| {
            let audit = s.audit();
            essentials::seed(s.store(), audit, &seed)
        })
        .unwrap();
    }

    fn gene() -> FeatureInput {
        let mut input = FeatureInput::new("PF3D7_0100100", "gene");
        input.residues = Some("ATGC".into());
        input.properties = vec![PropertyInput::new("note", "A"), PropertyInput::new("note", "B")];
        input.terms = vec![TermInput {
            curie: "GO:0006412".into(),
            publication: None,
            is_not: false,
        }];
        input.synonyms = vec![SynonymInput {
            name: "VAR1".into(),
            synonym_type: "synonym".into(),
            publication: None,
            is_current: true,
            is_internal: false,
        }];
        input
    }

    #[test]
    fn reimport_is_a_no_op() {
        let mut store = MemStore::new();
        seeded(&mut store);
        let vocab = VocabularyConfig::default();
        let sink = VecSink::new();

        let (feature, first) = ImportSession::run(store.begin().unwrap(), &sink, &vocab, |s| {
            let pf = s.organism("Pf")?;
            s.import_feature(&pf, &gene())
        })
        .unwrap();
        assert_eq!(feature.length, Some(4));
        // feature, synonym, two properties, term, synonym link
        assert_eq!(first.inserted, 6);

        sink.clear();
        let (_, second) = ImportSession::run(store.begin().unwrap(), &sink, &vocab, |s| {
            let pf = s.organism("Pf")?;
            s.import_feature(&pf, &gene())
        })
        .unwrap();
        assert_eq!(second.changes(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn missing_reference_rolls_back() {
        let mut store = MemStore::new();
        seeded(&mut store);
        let vocab = VocabularyConfig::default();
        let features_before = store.len(Table::Feature);

        let mut bad = gene();
        bad.properties.push(PropertyInput::new("colour", "red"));
        let err = ImportSession::run(store.begin().unwrap(), &VecSink::new(), &vocab, |s| {
            let pf = s.organism("Pf")?;
            s.import_feature(&pf, &bad)
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "CV term 'colour' not present in database");
        assert_eq!(store.len(Table::Feature), features_before);
    }

    #[test]
    fn batch_links_relationships_and_obsoletes_absent() {
        let mut store = MemStore::new();
        seeded(&mut store);
        let vocab = VocabularyConfig::default();
        let sink = VecSink::new();

        let mut transcript = FeatureInput::new("PF3D7_0100100.1", "mRNA");
        transcript.relationships = vec![RelationshipInput {
            relationship_type: "part_of".into(),
            object: "PF3D7_0100100".into(),
            value: None,
        }];
        let batch = vec![transcript, gene(), FeatureInput::new("PF3D7_0200200", "gene")];

        ImportSession::run(store.begin().unwrap(), &sink, &vocab, |s| {
            let pf = s.organism("Pf")?;
            s.import_batch(&pf, &batch, false)
        })
        .unwrap();
        assert_eq!(store.len(Table::FeatureRelationship), 1);

        let (_, stats) = ImportSession::run(store.begin().unwrap(), &sink, &vocab, |s| {
            let pf = s.organism("Pf")?;
            s.import_batch(&pf, &batch[..2], true)
        })
        .unwrap();
        assert_eq!(stats.obsoleted, 1);

        let txn = store.begin().unwrap();
        let stale: Feature = txn
            .first_where(|f: &Feature| f.uniquename == "PF3D7_0200200")
            .unwrap()
            .unwrap();
        assert!(stale.is_obsolete);
    }
}
