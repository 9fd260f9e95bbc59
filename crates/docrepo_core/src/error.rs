//! Error types for the repository engine.

use docrepo_document::{DocumentError, ObjectId};
use docrepo_driver::DriverError;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in repository operations.
///
/// A read miss is not an error; lookups return `Option`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An entity or repository type has no usable descriptor.
    #[error("invalid definition of {type_name}: {message}")]
    Definition {
        /// Rust type name of the offending type.
        type_name: String,
        /// What is wrong with it.
        message: String,
    },

    /// The driver reported a failure. Passed through unchanged.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// A record could not be mapped to or from a document.
    #[error("mapping error: {0}")]
    Document(#[from] DocumentError),

    /// `create` was called on a record that already has an identity.
    #[error("record in {collection} already has identity {id}")]
    IdentityAlreadyAssigned {
        /// Collection of the record.
        collection: String,
        /// The identity it carries.
        id: ObjectId,
    },

    /// `update` or `delete` was called on a record without identity.
    #[error("record in {collection} has no identity")]
    MissingIdentity {
        /// Collection of the record.
        collection: String,
    },

    /// Configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Creates a definition error.
    pub fn definition(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Definition {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns the driver error, if this is one.
    pub fn as_driver(&self) -> Option<&DriverError> {
        match self {
            Self::Driver(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the store was unreachable or timed out.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        self.as_driver().is_some_and(DriverError::is_connectivity)
    }

    /// Returns true if retrying the whole unit of work may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.as_driver().is_some_and(DriverError::is_transient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn driver_errors_pass_through() {
        let timeout = DriverError::ServerSelectionTimeout {
            timeout: Duration::from_secs(30),
        };
        let err = CoreError::from(timeout.clone());
        assert_eq!(err.as_driver(), Some(&timeout));
        assert_eq!(err.to_string(), timeout.to_string());
        assert!(err.is_connectivity());
        assert!(err.is_transient());
    }

    #[test]
    fn engine_errors_are_not_connectivity() {
        let err = CoreError::MissingIdentity {
            collection: "people".into(),
        };
        assert!(!err.is_connectivity());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "record in people has no identity");
    }

    #[test]
    fn definition_message() {
        let err = CoreError::definition("app::Person", "collection name is empty");
        assert_eq!(
            err.to_string(),
            "invalid definition of app::Person: collection name is empty"
        );
    }
}
