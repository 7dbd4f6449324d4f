//! Shared fixtures: a small Plasmodium reference data set.

#![allow(dead_code)]

use chado_sync::audit::SilentSink;
use chado_sync::config::VocabularyConfig;
use chado_sync::essentials::{self, ReferenceSeed};
use chado_sync::import::{FeatureInput, ImportSession, PropertyInput, SynonymInput, TermInput};
use chado_sync::store::Backend;

pub const REFERENCE: &str = r#"{
    "organisms": [
        {"genus": "Plasmodium", "species": "falciparum", "abbreviation": "Pfalciparum"}
    ],
    "dbs": ["GO"],
    "dbxrefs": ["UniProtKB:Q8I639", "UniProtKB:Q8I640"],
    "cvs": [
        {"name": "sequence", "db": "SO", "terms": ["gene", "mRNA", "chromosome"]},
        {"name": "feature_property", "terms": ["note", "description"]},
        {"name": "genedb_misc", "terms": ["colour"]},
        {"name": "relationship", "terms": ["part_of"], "relationship_types": true},
        {"name": "synonym_type", "terms": ["synonym", "previous_systematic_id"]},
        {"name": "biological_process", "db": "GO", "terms": [
            {"name": "translation", "accession": "0006412"},
            {"name": "cell cycle", "accession": "0007049"}
        ]}
    ],
    "publications": [
        {"uniquename": "null", "type": "null"},
        {"uniquename": "PMID:12368864", "type": "paper", "year": "2002"}
    ]
}"#;

pub fn reference() -> ReferenceSeed {
    serde_json::from_str(REFERENCE).unwrap()
}

/// Seed `backend` with [`REFERENCE`] and commit.
pub fn seed<B: Backend>(backend: &mut B) {
    let vocabularies = VocabularyConfig::default();
    let seed = reference();
    ImportSession::run(backend.begin().unwrap(), &SilentSink, &vocabularies, |session| {
        let audit = session.audit();
        essentials::seed(session.store(), audit, &seed)
    })
    .unwrap();
}

pub fn chromosome() -> FeatureInput {
    let mut input = FeatureInput::new("Pf3D7_01_v3", "chromosome");
    input.residues = Some("ATGAAACGATTTGCA".into());
    input
}

pub fn gene() -> FeatureInput {
    let mut input = FeatureInput::new("PF3D7_0100100", "gene");
    input.name = Some("VAR".into());
    input.properties = vec![
        PropertyInput::new("note", "erythrocyte membrane protein 1"),
        PropertyInput::new("description", "PfEMP1"),
    ];
    input.cross_references = vec!["UniProtKB:Q8I639".into()];
    input.terms = vec![TermInput {
        curie: "GO:0006412".into(),
        publication: Some("PMID:12368864".into()),
        is_not: false,
    }];
    input.synonyms = vec![SynonymInput {
        name: "MAL1P4.01".into(),
        synonym_type: "previous_systematic_id".into(),
        publication: None,
        is_current: true,
        is_internal: false,
    }];
    input.publications = vec!["PMID:12368864".into()];
    input
}
