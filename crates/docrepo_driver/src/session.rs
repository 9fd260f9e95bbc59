//! Session trait definition.

use crate::client::ClientId;
use crate::error::DriverResult;
use std::fmt;
use uuid::Uuid;

/// Identifier of a logical session.
///
/// Session IDs are random UUIDs, unique for the lifetime of the store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lsid:{}", self.0)
    }
}

/// A logical unit of work against the store.
///
/// A session owns zero or one active transaction at a time. Collection
/// operations that receive a session with an active transaction run
/// inside that transaction.
///
/// # Invariants
///
/// - `start_transaction` fails if a transaction is already active
/// - `commit_transaction` and `abort_transaction` fail if none is active
/// - after `end_session`, every other call fails with `SessionEnded`
/// - `end_session` is idempotent and aborts an open transaction
/// - collections of another client reject the session
pub trait Session: Send {
    /// Returns the session identifier.
    fn id(&self) -> SessionId;

    /// Returns the ID of the client that started this session.
    fn client_id(&self) -> ClientId;

    /// Starts a transaction on this session.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already active, the session
    /// has ended, or the store is unreachable.
    fn start_transaction(&mut self) -> DriverResult<()>;

    /// Commits the active transaction.
    ///
    /// Whether the commit succeeds or fails, the transaction is no longer
    /// active afterwards unless the driver reports otherwise through
    /// [`Session::in_transaction`].
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is active or the commit is rejected.
    fn commit_transaction(&mut self) -> DriverResult<()>;

    /// Aborts the active transaction, discarding its writes.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is active.
    fn abort_transaction(&mut self) -> DriverResult<()>;

    /// Ends the session and releases its resources.
    fn end_session(&mut self);

    /// Returns true while a transaction is active.
    fn in_transaction(&self) -> bool;

    /// Returns true once `end_session` has been called.
    fn has_ended(&self) -> bool;
}
