//! Rich diagnostic error types for chado-sync.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so the user learns which reference is
//! missing or which file could not be read, and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::model::Table;

/// Top-level error type for chado-sync.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] InputError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(chado::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(chado::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             The import was rolled back; nothing from this pass was persisted."
        )
    )]
    Redb { message: String },

    #[error("row encoding error in table {table}: {message}")]
    #[diagnostic(
        code(chado::store::codec),
        help(
            "A row could not be encoded or decoded. This usually means the data \
             directory was written by an incompatible version of chado-sync."
        )
    )]
    Codec { table: Table, message: String },

    #[error("row in table {table} has no id")]
    #[diagnostic(
        code(chado::store::unpersisted),
        help("Only rows returned by the store can be updated or deleted.")
    )]
    Unpersisted { table: Table },

    #[error("id space of table {table} exhausted")]
    #[diagnostic(code(chado::store::id_space))]
    IdSpaceExhausted { table: Table },
}

// ---------------------------------------------------------------------------
// Lookup errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LookupError {
    #[error("{kind} '{name}' not present in database")]
    #[diagnostic(
        code(chado::lookup::missing_reference),
        help(
            "Reference entities (organisms, vocabularies, terms, databases, \
             cross references, publications) are never created by an import. \
             Load them first, e.g. with `chado-sync seed --file <refs.json>`."
        )
    )]
    MissingReference { kind: &'static str, name: String },

    #[error("feature '{uniquename}' of organism '{organism}' not present in database")]
    #[diagnostic(
        code(chado::lookup::feature_not_found),
        help("Only existing features can be marked as obsolete.")
    )]
    FeatureNotFound {
        organism: String,
        uniquename: String,
    },

    #[error("ontology term '{curie}' belongs to unmanaged database '{db}'")]
    #[diagnostic(
        code(chado::lookup::unmanaged_ontology),
        help(
            "Ontology-term links are only reconciled for the databases listed in \
             `[vocabularies] ontologies`. Add the database there to import its terms."
        )
    )]
    UnmanagedOntology { curie: String, db: String },

    #[error("malformed cross reference '{curie}'")]
    #[diagnostic(
        code(chado::lookup::malformed_curie),
        help("Cross references are written as DB:ACCESSION, e.g. `PMID:12345`.")
    )]
    MalformedCurie { curie: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

impl LookupError {
    pub fn missing(kind: &'static str, name: impl Into<String>) -> Self {
        Self::MissingReference {
            kind,
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(chado::config::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(chado::config::parse),
        help("The configuration is TOML; see `SyncConfig` for the accepted sections.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(code(chado::config::write))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InputError {
    #[error("failed to read input file: {path}")]
    #[diagnostic(code(chado::input::read))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input file {path}: {message}")]
    #[diagnostic(
        code(chado::input::parse),
        help("Input batches are JSON documents; check the file against the documented layout.")
    )]
    Parse { path: String, message: String },
}

/// Convenience alias for chado-sync results.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Result alias for reference lookups.
pub type LookupResult<T> = std::result::Result<T, LookupError>;
