//! Error types for driver operations.

use docrepo_document::{DocumentError, ObjectId};
use std::time::Duration;
use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors reported by a document-store driver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The store could not be reached.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
    },

    /// No suitable server was found before the selection timeout elapsed.
    #[error("server selection timed out after {timeout:?}")]
    ServerSelectionTimeout {
        /// The configured selection timeout.
        timeout: Duration,
    },

    /// A document with the same identity already exists.
    #[error("duplicate key {id} in collection {collection}")]
    DuplicateKey {
        /// Collection the insert targeted.
        collection: String,
        /// The conflicting identity.
        id: ObjectId,
    },

    /// A concurrent transaction modified the same document first.
    #[error("write conflict on {id} in collection {collection}")]
    WriteConflict {
        /// Collection holding the document.
        collection: String,
        /// The contended document.
        id: ObjectId,
    },

    /// A transaction primitive was used in the wrong state.
    #[error("transaction error: {message}")]
    Transaction {
        /// Description of the misuse.
        message: String,
    },

    /// The session was already ended.
    #[error("session has ended")]
    SessionEnded,

    /// The store rejected the operation.
    #[error("operation failed: {message}")]
    Operation {
        /// Description of the failure.
        message: String,
    },

    /// A document could not be handled.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

impl DriverError {
    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Creates an operation error.
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }

    /// Returns true if the store was unreachable or timed out.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ServerSelectionTimeout { .. }
        )
    }

    /// Returns true if retrying the whole unit of work may succeed.
    ///
    /// Retry policy belongs to the caller; the engine never retries.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.is_connectivity() || matches!(self, Self::WriteConflict { .. })
    }
}
