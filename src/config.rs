//! Configuration of a chado-sync installation, persisted as TOML.
//!
//! ```toml
//! [store]
//! data_dir = "/var/lib/chado-sync"
//!
//! [audit]
//! verbose = true
//! format = "text"
//!
//! [vocabularies]
//! feature_types = "sequence"
//! ontologies = ["GO"]
//! ```
//!
//! Every section and key is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub store: StoreConfig,
    pub audit: AuditConfig,
    pub vocabularies: VocabularyConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the database file.
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("chado-data"),
        }
    }
}

/// How audit lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit one line per effective change. Silent otherwise.
    pub verbose: bool,
    pub format: AuditFormat,
}

/// Vocabularies used to resolve names in candidate batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Vocabulary of feature types (`gene`, `mRNA`, ...).
    pub feature_types: String,
    /// Vocabulary of property types (`note`, `description`, ...).
    pub feature_properties: String,
    /// Vocabulary holding relationship types (`part_of`, `derives_from`).
    pub relationships: String,
    /// Vocabulary of synonym types (`synonym`, `previous_systematic_id`).
    pub synonym_types: String,
    /// Publication used for term and synonym links that name none.
    pub default_publication: String,
    /// Databases whose ontology-term links an import owns.
    pub ontologies: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            feature_types: "sequence".into(),
            feature_properties: "feature_property".into(),
            relationships: "relationship".into(),
            synonym_types: "synonym_type".into(),
            default_publication: "null".into(),
            ontologies: vec!["GO".into()],
        }
    }
}

impl SyncConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
