//! Error types for schema description and traversal.

/// Schema-authoring defects. Raised when a record type is first described
/// and expected to abort initialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Two fields of one record type share a name.
    #[error("duplicate field `{field}` in record `{record}`")]
    DuplicateField {
        record: &'static str,
        field: &'static str,
    },

    /// A field was declared with an empty name.
    #[error("empty field name in record `{record}` (position {position})")]
    EmptyFieldName {
        record: &'static str,
        position: usize,
    },

    /// The registry is sealed and this record type was never registered.
    #[error("unknown record type `{record}` (registry is sealed)")]
    UnknownRecord { record: &'static str },
}

/// Errors that abort one traversal.
#[derive(Debug, thiserror::Error)]
pub enum TraverseError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A stored value's tag disagrees with the declared field type.
    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// A value the destination format cannot hold without loss.
    #[error("unrepresentable value at `{path}`: {message}")]
    Unrepresentable { path: String, message: String },

    /// The source could not be read at all (malformed document bytes).
    #[error("corrupt source at `{path}`: {message}")]
    Corrupt { path: String, message: String },

    /// The output sink failed.
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TraverseError {
    /// Whether this error reports stored data that disagrees with its schema.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, TraverseError::TypeMismatch { .. })
    }
}
