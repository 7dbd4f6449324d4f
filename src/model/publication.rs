use serde::{Deserialize, Serialize};

use super::{RowId, Table, record};
use crate::diff::{Diffable, MutableField, mutable_fields};
use crate::matcher::Singleton;

/// A bibliographic record. Identity key: `(uniquename, type_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pub {
    pub id: Option<RowId>,
    pub uniquename: String,
    pub type_id: RowId,
    pub title: Option<String>,
    pub volume: Option<String>,
    pub volume_title: Option<String>,
    pub series_name: Option<String>,
    pub issue: Option<String>,
    pub year: Option<String>,
    pub pages: Option<String>,
    pub short_reference: Option<String>,
    pub publisher: Option<String>,
    pub place: Option<String>,
    pub is_obsolete: bool,
}

impl Pub {
    pub fn new(uniquename: impl Into<String>, type_id: RowId) -> Self {
        Self {
            id: None,
            uniquename: uniquename.into(),
            type_id,
            title: None,
            volume: None,
            volume_title: None,
            series_name: None,
            issue: None,
            year: None,
            pages: None,
            short_reference: None,
            publisher: None,
            place: None,
            is_obsolete: false,
        }
    }
}

record!(Pub, Table::Pub);

impl Diffable for Pub {
    const MUTABLE_FIELDS: &'static [MutableField<Self>] = mutable_fields![
        Pub;
        title,
        volume,
        volume_title,
        series_name,
        issue,
        year,
        pages,
        short_reference,
        publisher,
        place,
        is_obsolete,
    ];
}

impl Singleton for Pub {
    const NOUN: &'static str = "publication";

    fn same_key(&self, other: &Self) -> bool {
        self.uniquename == other.uniquename && self.type_id == other.type_id
    }

    fn label(&self) -> String {
        format!("publication '{}'", self.uniquename)
    }
}
