//! Transaction scopes.
//!
//! A scope either owns a fresh session and transaction, or joins the one
//! already open on the current call chain. Only the owner ever commits,
//! aborts, or ends the session; a joined scope's exit does nothing and
//! its failures simply propagate to the owner.

use crate::context::{SessionContext, SessionHandle};
use crate::error::{CoreError, CoreResult};
use docrepo_driver::{Client, DriverError};
use tracing::{debug, warn};

/// How the work inside a scope ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The work succeeded; the owner commits.
    Success,
    /// The work failed; the owner aborts.
    Failure,
}

/// An entered transaction scope.
///
/// Dropping an owning scope without calling [`TransactionScope::exit`]
/// (early return, panic) aborts the transaction if it is still active,
/// ends the session, and clears the session context.
///
/// # Example
///
/// ```rust
/// use docrepo_core::{Database, Outcome, TransactionScope};
///
/// let db = Database::open_in_memory("app");
/// let client = db.client().as_ref();
///
/// let outer = TransactionScope::enter(client).unwrap();
/// let inner = TransactionScope::enter(client).unwrap();
/// assert!(outer.is_owner());
/// assert!(!inner.is_owner());
///
/// inner.exit(Outcome::Success).unwrap(); // no-op
/// outer.exit(Outcome::Success).unwrap(); // commits
/// ```
#[must_use = "a scope must be exited with an outcome"]
pub struct TransactionScope {
    handle: SessionHandle,
    is_owner: bool,
    finished: bool,
}

impl TransactionScope {
    /// Enters a scope on the current call chain.
    ///
    /// Joins the chain's active session if there is one; otherwise starts
    /// a session and a transaction on `client` and installs the session as
    /// the chain's current one.
    ///
    /// A chain holds one session at a time, so a scope on a client of a
    /// different store cannot join the active one and fails instead.
    ///
    /// # Errors
    ///
    /// Propagates driver errors from starting the session or transaction.
    /// Returns [`DriverError::Transaction`] if the chain's active session
    /// belongs to another client's store. Nothing is left installed when
    /// this fails.
    pub fn enter(client: &dyn Client) -> CoreResult<Self> {
        if let Some(handle) = SessionContext::get() {
            if !handle.belongs_to(client.client_id()) {
                debug!(
                    session = %handle.id(),
                    owner = %handle.client_id(),
                    client = %client.client_id(),
                    "refused to join transaction of another client"
                );
                return Err(DriverError::transaction(format!(
                    "{} is bound to {}, not {}",
                    handle.id(),
                    handle.client_id(),
                    client.client_id()
                ))
                .into());
            }
            debug!(session = %handle.id(), "joined transaction");
            return Ok(Self {
                handle,
                is_owner: false,
                finished: false,
            });
        }

        let handle = SessionHandle::new(client.start_session()?);
        if let Err(err) = handle.start_transaction() {
            handle.end_session();
            return Err(err.into());
        }
        SessionContext::set(Some(handle.clone()));
        debug!(session = %handle.id(), "started transaction");

        Ok(Self {
            handle,
            is_owner: true,
            finished: false,
        })
    }

    /// Returns the session this scope runs in.
    pub fn session(&self) -> &SessionHandle {
        &self.handle
    }

    /// Returns true if this scope created the session.
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// Leaves the scope.
    ///
    /// For a joined scope this does nothing. For the owner, success
    /// commits and failure aborts; either way the session is then ended
    /// and the context cleared.
    ///
    /// # Errors
    ///
    /// On success, returns the commit error if the commit fails (the
    /// transaction is aborted first if still active). On failure, returns
    /// the abort error if the abort itself fails.
    pub fn exit(mut self, outcome: Outcome) -> CoreResult<()> {
        self.finished = true;
        if !self.is_owner {
            return Ok(());
        }

        let result: CoreResult<()> = match outcome {
            Outcome::Success => match self.handle.commit_transaction() {
                Ok(()) => {
                    debug!(session = %self.handle.id(), "committed transaction");
                    Ok(())
                }
                Err(err) => {
                    debug!(session = %self.handle.id(), error = %err, "commit failed");
                    self.abort_if_active();
                    Err(err.into())
                }
            },
            Outcome::Failure => self.abort().map_err(CoreError::from),
        };

        self.release();
        result
    }

    /// Runs `f` inside a scope and exits with its outcome.
    ///
    /// `f`'s own error is returned unchanged after the owner aborts. If
    /// the abort fails too, that is logged and `f`'s error still wins.
    ///
    /// # Errors
    ///
    /// Returns `f`'s error, or a [`CoreError`] from entering the scope or
    /// committing.
    pub fn run<T, E, F>(client: &dyn Client, f: F) -> Result<T, E>
    where
        F: FnOnce(&SessionHandle) -> Result<T, E>,
        E: From<CoreError>,
    {
        let scope = Self::enter(client)?;
        match f(scope.session()) {
            Ok(value) => {
                scope.exit(Outcome::Success)?;
                Ok(value)
            }
            Err(err) => {
                let session = scope.handle.id();
                if let Err(abort_err) = scope.exit(Outcome::Failure) {
                    warn!(%session, error = %abort_err, "abort after failure failed");
                }
                Err(err)
            }
        }
    }

    fn abort(&self) -> docrepo_driver::DriverResult<()> {
        if !self.handle.in_transaction() {
            return Ok(());
        }
        self.handle.abort_transaction()?;
        debug!(session = %self.handle.id(), "aborted transaction");
        Ok(())
    }

    fn abort_if_active(&self) {
        if let Err(err) = self.abort() {
            warn!(session = %self.handle.id(), error = %err, "abort failed");
        }
    }

    fn release(&self) {
        self.handle.end_session();
        SessionContext::clear();
        debug!(session = %self.handle.id(), "ended session");
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.finished || !self.is_owner {
            return;
        }
        debug!(session = %self.handle.id(), "scope dropped without exit");
        self.abort_if_active();
        self.release();
    }
}

impl std::fmt::Debug for TransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionScope")
            .field("session", &self.handle)
            .field("is_owner", &self.is_owner)
            .finish()
    }
}
