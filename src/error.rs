//! Error types for the flattening core

use thiserror::Error;

/// Errors raised by the core. Missing or malformed optional data is never an
/// error; it resolves to a column default instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlattenError {
    #[error("Invalid field path `{path}`: {reason}")]
    InvalidFieldPath { path: String, reason: String },

    #[error("Invalid identifier pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Expected a JSON array of inventory records, found {found}")]
    NotASequence { found: &'static str },

    #[error("Inventory record #{position} is not a JSON object (found {found})")]
    NotARecord { position: usize, found: &'static str },

    #[error("Column `{column}` refers to unknown association `{index}`")]
    UnknownIndex { column: String, index: String },

    #[error("Column `{column}` is declared more than once")]
    DuplicateColumn { column: String },
}

/// Short name of a JSON value's type, used in error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
