//! Error types for the document crate.

use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur while building, reading, or mapping documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Float values cannot be stored in a document.
    #[error("float values are not supported in documents")]
    FloatForbidden,

    /// An integer does not fit into a signed 64-bit value.
    #[error("integer overflow: {value} does not fit in i64")]
    IntegerOverflow {
        /// The textual form of the offending number.
        value: String,
    },

    /// A record did not serialize to a key-value map.
    #[error("expected a document, found {found}")]
    NotADocument {
        /// Kind of value that was produced instead.
        found: String,
    },

    /// Text is not a valid 24-character hex object id.
    #[error("invalid object id: {input:?}")]
    InvalidObjectId {
        /// The rejected input.
        input: String,
    },

    /// A required field is absent.
    #[error("missing field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// A field holds a value of the wrong kind.
    #[error("field {field}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Name of the field.
        field: String,
        /// Expected kind of value.
        expected: &'static str,
        /// Kind of value actually stored.
        found: &'static str,
    },

    /// Serializing a record into a document failed.
    #[error("serialization failed: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// Deserializing a document into a record failed.
    #[error("deserialization failed: {message}")]
    Deserialization {
        /// Description of the failure.
        message: String,
    },
}

impl DocumentError {
    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }
}
