//! Chain-local session context.
//!
//! Each thread is one logical call chain and owns one slot holding the
//! session of the transaction it is currently inside, if any. Slots are
//! never shared: setting one on a thread is invisible to every other
//! thread. A chain that continues on another thread carries its handle
//! over explicitly with [`SessionContext::propagate`].

use docrepo_driver::{ClientId, DriverResult, Session, SessionId};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

thread_local! {
    static CURRENT: RefCell<Option<SessionHandle>> = const { RefCell::new(None) };
}

/// Shared handle to a driver session.
///
/// Cloning the handle does not clone the session. The session is locked
/// only for the duration of one driver call, so nested operations on the
/// same chain never contend with themselves.
///
/// Outside this crate the handle only exposes read accessors; driver
/// calls go through repositories and scopes.
///
/// ```rust
/// use docrepo_core::{Database, Outcome, TransactionScope};
/// use docrepo_driver::Client;
///
/// let db = Database::open_in_memory("app");
/// let scope = TransactionScope::enter(db.client().as_ref()).unwrap();
/// assert!(scope.session().in_transaction());
/// assert!(scope.session().belongs_to(db.client().client_id()));
/// scope.exit(Outcome::Success).unwrap();
/// ```
///
/// ```compile_fail
/// use docrepo_core::{Database, TransactionScope};
///
/// let db = Database::open_in_memory("app");
/// let scope = TransactionScope::enter(db.client().as_ref()).unwrap();
/// scope.session().with(|session| session.in_transaction());
/// ```
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    client: ClientId,
    session: Arc<Mutex<Box<dyn Session>>>,
}

impl SessionHandle {
    /// Wraps a driver session.
    pub fn new(session: Box<dyn Session>) -> Self {
        Self {
            id: session.id(),
            client: session.client_id(),
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Returns the session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the ID of the client that started the session.
    pub fn client_id(&self) -> ClientId {
        self.client
    }

    /// Returns true if the session was started by a client of `client`'s store.
    pub fn belongs_to(&self, client: ClientId) -> bool {
        self.client == client
    }

    /// Runs `f` with exclusive access to the session.
    ///
    /// The lock is not reentrant: `f` must not call back into repository
    /// operations.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut dyn Session) -> R) -> R {
        let mut guard = self.session.lock();
        f(guard.as_mut())
    }

    /// Returns whether the session has an active transaction.
    pub fn in_transaction(&self) -> bool {
        self.with(|s| s.in_transaction())
    }

    /// Returns whether the session has ended.
    pub fn has_ended(&self) -> bool {
        self.with(|s| s.has_ended())
    }

    pub(crate) fn start_transaction(&self) -> DriverResult<()> {
        self.with(|s| s.start_transaction())
    }

    pub(crate) fn commit_transaction(&self) -> DriverResult<()> {
        self.with(|s| s.commit_transaction())
    }

    pub(crate) fn abort_transaction(&self) -> DriverResult<()> {
        self.with(|s| s.abort_transaction())
    }

    pub(crate) fn end_session(&self) {
        self.with(|s| s.end_session());
    }

    /// Returns true if both handles refer to the same session.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.session, &b.session)
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("client", &self.client)
            .finish()
    }
}

/// Accessors for the current thread's session slot.
pub struct SessionContext;

impl SessionContext {
    /// Returns the current session, if the chain is inside a transaction.
    pub fn get() -> Option<SessionHandle> {
        CURRENT.with(|slot| slot.borrow().clone())
    }

    /// Replaces the current session, returning the previous one.
    pub fn set(handle: Option<SessionHandle>) -> Option<SessionHandle> {
        CURRENT.with(|slot| slot.replace(handle))
    }

    /// Returns true if the chain is inside a transaction.
    pub fn is_active() -> bool {
        CURRENT.with(|slot| slot.borrow().is_some())
    }

    /// Runs `f` with `handle` as the current session, then restores the
    /// previous slot value, also when `f` panics.
    ///
    /// # Example
    ///
    /// ```rust
    /// use docrepo_core::{Database, SessionContext, TransactionScope};
    ///
    /// let db = Database::open_in_memory("app");
    /// let scope = TransactionScope::enter(db.client().as_ref()).unwrap();
    /// let handle = scope.session().clone();
    ///
    /// std::thread::scope(|s| {
    ///     s.spawn(|| {
    ///         assert!(!SessionContext::is_active());
    ///         SessionContext::propagate(handle, || assert!(SessionContext::is_active()));
    ///     });
    /// });
    /// ```
    pub fn propagate<R>(handle: SessionHandle, f: impl FnOnce() -> R) -> R {
        let _restore = Restore(Some(Self::set(Some(handle))));
        f()
    }

    /// Clears the slot without touching a destroyed thread-local.
    pub(crate) fn clear() {
        let _ = CURRENT.try_with(|slot| slot.replace(None));
    }
}

struct Restore(Option<Option<SessionHandle>>);

impl Drop for Restore {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            let _ = CURRENT.try_with(|slot| slot.replace(previous));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrepo_driver::{Client, InMemoryClient};

    fn handle(client: &InMemoryClient) -> SessionHandle {
        SessionHandle::new(client.start_session().unwrap())
    }

    #[test]
    fn set_returns_previous() {
        let client = InMemoryClient::new("test");
        let first = handle(&client);
        let second = handle(&client);

        assert!(SessionContext::set(Some(first.clone())).is_none());
        let previous = SessionContext::set(Some(second.clone())).unwrap();
        assert!(SessionHandle::ptr_eq(&previous, &first));
        assert!(SessionHandle::ptr_eq(&SessionContext::get().unwrap(), &second));

        SessionContext::set(None);
        assert!(!SessionContext::is_active());
    }

    #[test]
    fn slots_are_thread_local() {
        let client = InMemoryClient::new("test");
        SessionContext::set(Some(handle(&client)));

        let seen_elsewhere = std::thread::spawn(SessionContext::is_active).join().unwrap();
        assert!(!seen_elsewhere);
        assert!(SessionContext::is_active());

        SessionContext::set(None);
    }

    #[test]
    fn propagate_restores_previous() {
        let client = InMemoryClient::new("test");
        let outer = handle(&client);
        let inner = handle(&client);
        SessionContext::set(Some(outer.clone()));

        let id = SessionContext::propagate(inner.clone(), || SessionContext::get().unwrap().id());
        assert_eq!(id, inner.id());
        assert!(SessionHandle::ptr_eq(&SessionContext::get().unwrap(), &outer));

        SessionContext::set(None);
    }

    #[test]
    fn propagate_restores_on_panic() {
        let client = InMemoryClient::new("test");
        let inner = handle(&client);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            SessionContext::propagate(inner, || panic!("boom"));
        }));
        assert!(result.is_err());
        assert!(!SessionContext::is_active());
    }

    #[test]
    fn handle_clones_share_session() {
        let client = InMemoryClient::new("test");
        let a = handle(&client);
        let b = a.clone();
        assert!(SessionHandle::ptr_eq(&a, &b));
        assert_eq!(a.id(), b.id());

        a.start_transaction().unwrap();
        assert!(b.in_transaction());
        b.abort_transaction().unwrap();
        assert!(!a.in_transaction());
    }

    #[test]
    fn handle_records_its_client() {
        let client = InMemoryClient::new("test");
        let other = InMemoryClient::new("other");
        let h = handle(&client);

        assert_eq!(h.client_id(), client.client_id());
        assert!(h.belongs_to(client.client_id()));
        assert!(!h.belongs_to(other.client_id()));
    }
}
