//! Column descriptors for result sets and catalog records.

use serde::{Deserialize, Serialize};

use super::mapping::{SemanticType, StorageTag};

/// Metadata for one column.
///
/// Result-set columns know their name, source table, declared type and the
/// storage tag of the first row; `required` stays `None` for them because
/// the engine does not report nullability per result column. Catalog
/// columns (`Connection::record`) fill in the schema-level fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub semantic_type: SemanticType,
    /// Source table; empty for expressions.
    pub table: String,
    /// Declared type text as written in the schema; empty when undeclared.
    pub declared_type: String,
    /// `Some(true)` for NOT NULL columns; `None` when unknown.
    pub required: Option<bool>,
    pub default_value: Option<String>,
    pub primary_key: bool,
    /// The column aliases the implicit row id (`INTEGER PRIMARY KEY`).
    pub auto_value: bool,
    /// Storage tag of the first fetched row; `None` for an empty result.
    pub storage_tag: Option<StorageTag>,
}

impl Column {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            table: table.into(),
            declared_type: String::new(),
            required: None,
            default_value: None,
            primary_key: false,
            auto_value: false,
            storage_tag: None,
        }
    }
}
