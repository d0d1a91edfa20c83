//! # Model Errors
//!
//! Errors raised while building or loading field specifications.

use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Two constraints on one field share a name
    #[error("Duplicate constraint name '{0}'")]
    DuplicateConstraintName(String),

    /// A constraint has an empty name
    #[error("Constraint name must not be empty")]
    EmptyConstraintName,

    /// A JSON value has no counterpart in the value model
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// An input spec document could not be parsed or is structurally invalid
    #[error("Malformed input spec '{path}': {reason}")]
    MalformedDocument { path: String, reason: String },

    /// Two documents were registered under the same name
    #[error("Input spec '{0}' is already registered")]
    DuplicateDocument(String),

    /// Filesystem error while loading documents
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ModelError {
    /// Create a malformed document error
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::DuplicateConstraintName(_) => "DUPLICATE_CONSTRAINT_NAME",
            ModelError::EmptyConstraintName => "EMPTY_CONSTRAINT_NAME",
            ModelError::UnsupportedValue(_) => "UNSUPPORTED_VALUE",
            ModelError::MalformedDocument { .. } => "MALFORMED_DOCUMENT",
            ModelError::DuplicateDocument(_) => "DUPLICATE_DOCUMENT",
            ModelError::Io { .. } => "IO_ERROR",
        }
    }
}
