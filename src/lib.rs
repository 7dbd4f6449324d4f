// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # chado-sync
//!
//! Reconciles externally sourced genome annotation (features, locations,
//! properties, ontology terms, synonyms, publications, relationships)
//! against a Chado-style relational store. Each incoming record is classified
//! as new, identical or changed and the matching insert, update or delete is
//! applied, with one audit line per effective change.
//!
//! ## Architecture
//!
//! - **Matcher** (`matcher`): natural-key lookup of singletons, slot matching of collection members
//! - **Differ** (`diff`): fixed per-kind allow-lists of mutable attributes
//! - **Upsert** (`upsert`): insert / update / unchanged for singletons
//! - **Reconciler** (`reconcile`, `rank`): two-pass set diff with rank allocation
//! - **Obsolescence** (`obsolete`): features are flagged, never deleted
//! - **Storage** (`store`): in-memory or redb-backed tables, one transaction per pass
//! - **Import** (`import`): the transaction boundary and name resolution for candidate batches
//!
//! ## Library usage
//!
//! ```no_run
//! use chado_sync::audit::LineSink;
//! use chado_sync::config::VocabularyConfig;
//! use chado_sync::import::{FeatureInput, ImportSession, PropertyInput};
//! use chado_sync::store::Backend;
//! use chado_sync::store::durable::DurableStore;
//!
//! let mut store = DurableStore::open("chado-data".as_ref()).unwrap();
//! let audit = LineSink::stdout();
//! let vocabularies = VocabularyConfig::default();
//!
//! let mut gene = FeatureInput::new("PF3D7_0100100", "gene");
//! gene.properties.push(PropertyInput::new("note", "erythrocyte membrane protein"));
//!
//! let txn = store.begin().unwrap();
//! let (_, stats) = ImportSession::run(txn, &audit, &vocabularies, |session| {
//!     let organism = session.organism("Pf3D7")?;
//!     session.import_feature(&organism, &gene)
//! })
//! .unwrap();
//! println!("{stats}");
//! ```

pub mod audit;
pub mod config;
pub mod diff;
pub mod error;
pub mod essentials;
pub mod import;
pub mod lookup;
pub mod matcher;
pub mod model;
pub mod obsolete;
pub mod rank;
pub mod reconcile;
pub mod scope;
pub mod store;
pub mod upsert;
