//! Declared column type → semantic type mapping.
//!
//! The engine stores values dynamically; the declared type in the schema is
//! only a hint. Result columns and catalog columns both go through
//! [`classify`] so they report the same type for the same declaration.

use serde::{Deserialize, Serialize};

/// Semantic type a column reports to the host abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Integer,
    Double,
    Bytes,
    Boolean,
    Text,
    Unknown,
}

/// The engine's runtime classification of a single stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageTag {
    Integer,
    Float,
    Text,
    Blob,
    Null,
}

impl StorageTag {
    /// Maps the engine's fundamental datatype code (`SQLITE_INTEGER` = 1 ..
    /// `SQLITE_NULL` = 5). Unknown codes are treated as text, as the engine does.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Integer,
            2 => Self::Float,
            4 => Self::Blob,
            5 => Self::Null,
            _ => Self::Text,
        }
    }
}

const INTEGER_FAMILY: &[&str] = &[
    "int", "integer", "tinyint", "smallint", "mediumint", "bigint", "int2", "int8",
];
const DOUBLE_FAMILY: &[&str] = &["real", "float", "double", "double precision"];
const DOUBLE_PREFIXES: &[&str] = &["numeric", "decimal"];
const BOOLEAN_FAMILY: &[&str] = &["bool", "boolean"];

/// Classify a column from its declared type text, falling back to the
/// storage tag when no type was declared (expressions, `SELECT 1`, ...).
pub fn classify(declared: &str, tag: Option<StorageTag>) -> SemanticType {
    let declared = declared.trim();
    if !declared.is_empty() {
        return classify_declared(&declared.to_ascii_lowercase());
    }

    match tag {
        Some(StorageTag::Integer) => SemanticType::Integer,
        Some(StorageTag::Float) => SemanticType::Double,
        Some(StorageTag::Blob) => SemanticType::Bytes,
        Some(StorageTag::Text) => SemanticType::Text,
        Some(StorageTag::Null) | None => SemanticType::Unknown,
    }
}

fn classify_declared(lower: &str) -> SemanticType {
    if INTEGER_FAMILY.contains(&lower) {
        SemanticType::Integer
    } else if DOUBLE_FAMILY.contains(&lower)
        || DOUBLE_PREFIXES.iter().any(|p| lower.starts_with(p))
    {
        SemanticType::Double
    } else if lower == "blob" {
        SemanticType::Bytes
    } else if BOOLEAN_FAMILY.contains(&lower) {
        SemanticType::Boolean
    } else {
        SemanticType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_types_are_case_insensitive() {
        assert_eq!(classify("INTEGER", None), SemanticType::Integer);
        assert_eq!(classify("Int", None), SemanticType::Integer);
        assert_eq!(classify("BIGINT", None), SemanticType::Integer);
        assert_eq!(classify("REAL", None), SemanticType::Double);
        assert_eq!(classify("Double Precision", None), SemanticType::Double);
        assert_eq!(classify("NUMERIC(10,2)", None), SemanticType::Double);
        assert_eq!(classify("decimal(5)", None), SemanticType::Double);
        assert_eq!(classify("BLOB", None), SemanticType::Bytes);
        assert_eq!(classify("Boolean", None), SemanticType::Boolean);
        assert_eq!(classify("VARCHAR(20)", None), SemanticType::Text);
        assert_eq!(classify("datetime", None), SemanticType::Text);
    }

    #[test]
    fn declared_type_wins_over_storage_tag() {
        assert_eq!(classify("text", Some(StorageTag::Integer)), SemanticType::Text);
        assert_eq!(classify("integer", Some(StorageTag::Blob)), SemanticType::Integer);
    }

    #[test]
    fn empty_declared_falls_back_to_tag() {
        assert_eq!(classify("", Some(StorageTag::Integer)), SemanticType::Integer);
        assert_eq!(classify("", Some(StorageTag::Float)), SemanticType::Double);
        assert_eq!(classify("", Some(StorageTag::Blob)), SemanticType::Bytes);
        assert_eq!(classify("", Some(StorageTag::Text)), SemanticType::Text);
        assert_eq!(classify("", Some(StorageTag::Null)), SemanticType::Unknown);
        assert_eq!(classify("  ", None), SemanticType::Unknown);
    }

    #[test]
    fn storage_codes() {
        assert_eq!(StorageTag::from_code(1), StorageTag::Integer);
        assert_eq!(StorageTag::from_code(2), StorageTag::Float);
        assert_eq!(StorageTag::from_code(3), StorageTag::Text);
        assert_eq!(StorageTag::from_code(4), StorageTag::Blob);
        assert_eq!(StorageTag::from_code(5), StorageTag::Null);
    }
}
