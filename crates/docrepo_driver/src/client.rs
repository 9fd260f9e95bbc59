//! Client and connector traits.

use crate::collection::Collection;
use crate::error::DriverResult;
use crate::session::Session;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of the store a client talks to.
///
/// Clients sharing a store report the same ID, and every session carries
/// the ID of the client that started it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Creates a new random client ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client:{}", self.0)
    }
}

/// A connection to one database of a document store.
///
/// Clients are shared across threads. Sessions they hand out are not:
/// each session belongs to exactly one call chain for its lifetime.
pub trait Client: Send + Sync {
    /// Returns the identity of the store behind this client.
    fn client_id(&self) -> ClientId;

    /// Returns the name of the database this client is bound to.
    fn database_name(&self) -> &str;

    /// Returns a handle to the named collection.
    ///
    /// # Errors
    ///
    /// Returns a connectivity error if the store is unreachable.
    fn collection(&self, name: &str) -> DriverResult<Arc<dyn Collection>>;

    /// Starts a new session.
    ///
    /// # Errors
    ///
    /// Returns a connectivity error if the store is unreachable.
    fn start_session(&self) -> DriverResult<Box<dyn Session>>;
}

/// Establishes clients from a connection URI.
pub trait Connector {
    /// Connects to `uri` and binds the client to `database`.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the URI is unsupported or the store
    /// cannot be reached.
    fn connect(uri: &str, database: &str) -> DriverResult<Arc<dyn Client>>;
}
