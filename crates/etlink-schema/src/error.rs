use crate::types::FieldType;

/// Errors that can occur while building schemas or encoding/decoding records.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Two fields in one schema share a name.
    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    /// A schema was built without any field.
    #[error("schema {0} has no fields")]
    EmptySchema(String),

    /// The encoded record would not fit the one-byte frame length.
    #[error("schema {name} is {size} bytes (max {max})")]
    SchemaTooLarge { name: String, size: usize, max: usize },

    /// The record has no field with this name.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A value's kind disagrees with the declared field type.
    #[error("field {field} expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: FieldType,
    },

    /// The byte slice handed to the decoder has the wrong size.
    #[error("payload is {actual} bytes, schema {schema} expects {expected}")]
    LengthMismatch {
        schema: String,
        expected: usize,
        actual: usize,
    },

    /// A textual value could not be parsed for its field type.
    #[error("invalid {field_type} value: {value}")]
    InvalidValue { field_type: FieldType, value: String },

    /// The schema definition file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema definition is not valid JSON.
    #[error("schema definition is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
