//! Fault injection for driver calls.
//!
//! [`FaultyClient`] wraps any [`Client`] and fails chosen calls with a
//! chosen [`DriverError`] before they reach the wrapped driver. Every call
//! is counted, armed or not, so tests can also assert how often the
//! engine touched each primitive.

use docrepo_document::{Document, ObjectId};
use docrepo_driver::{
    Client, ClientId, Collection, DeleteResult, DriverError, DriverResult, Filter, ReplaceResult,
    Session, SessionId,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A driver call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// `Client::start_session`.
    StartSession,
    /// `Client::collection`.
    Collection,
    /// `Session::start_transaction`.
    StartTransaction,
    /// `Session::commit_transaction`.
    Commit,
    /// `Session::abort_transaction`.
    Abort,
    /// Any `Collection` CRUD call.
    Operation,
}

#[derive(Debug, Clone)]
struct Fault {
    error: DriverError,
    /// Remaining failures; `None` fails until cleared.
    remaining: Option<u32>,
}

#[derive(Debug, Default)]
struct FaultState {
    armed: Mutex<HashMap<FaultPoint, Fault>>,
    calls: Mutex<HashMap<FaultPoint, u64>>,
}

impl FaultState {
    fn check(&self, point: FaultPoint) -> DriverResult<()> {
        *self.calls.lock().entry(point).or_insert(0) += 1;

        let mut armed = self.armed.lock();
        let Some(fault) = armed.get_mut(&point) else {
            return Ok(());
        };
        let error = fault.error.clone();
        let exhausted = match fault.remaining.as_mut() {
            None => false,
            Some(n) => {
                *n -= 1;
                *n == 0
            }
        };
        if exhausted {
            armed.remove(&point);
        }
        tracing::debug!(?point, %error, "injected fault");
        Err(error)
    }
}

/// A client that injects failures into a wrapped client.
///
/// # Example
///
/// ```rust
/// use docrepo_driver::{Client, DriverError, InMemoryClient};
/// use docrepo_testkit::{FaultPoint, FaultyClient};
/// use std::sync::Arc;
///
/// let faulty = FaultyClient::new(Arc::new(InMemoryClient::new("test")));
/// faulty.fail_once(FaultPoint::StartSession, DriverError::connection("refused"));
///
/// assert!(faulty.start_session().is_err());
/// assert!(faulty.start_session().is_ok());
/// assert_eq!(faulty.calls(FaultPoint::StartSession), 2);
/// ```
#[derive(Clone)]
pub struct FaultyClient {
    inner: Arc<dyn Client>,
    state: Arc<FaultState>,
}

impl FaultyClient {
    /// Wraps `inner` with no faults armed.
    pub fn new(inner: Arc<dyn Client>) -> Self {
        Self {
            inner,
            state: Arc::new(FaultState::default()),
        }
    }

    /// Fails every call at `point` until cleared.
    pub fn fail(&self, point: FaultPoint, error: DriverError) {
        self.arm(point, error, None);
    }

    /// Fails the next call at `point` only.
    pub fn fail_once(&self, point: FaultPoint, error: DriverError) {
        self.fail_times(point, 1, error);
    }

    /// Fails the next `times` calls at `point`.
    pub fn fail_times(&self, point: FaultPoint, times: u32, error: DriverError) {
        if times > 0 {
            self.arm(point, error, Some(times));
        }
    }

    /// Fails every call at `point` with a server selection timeout.
    pub fn fail_unreachable(&self, point: FaultPoint) {
        self.fail(
            point,
            DriverError::ServerSelectionTimeout {
                timeout: Duration::from_millis(1),
            },
        );
    }

    /// Disarms `point`.
    pub fn clear(&self, point: FaultPoint) {
        self.state.armed.lock().remove(&point);
    }

    /// Disarms every point.
    pub fn clear_all(&self) {
        self.state.armed.lock().clear();
    }

    /// Returns how many calls reached `point`, failed or not.
    pub fn calls(&self, point: FaultPoint) -> u64 {
        self.state.calls.lock().get(&point).copied().unwrap_or(0)
    }

    /// Resets every call counter.
    pub fn reset_calls(&self) {
        self.state.calls.lock().clear();
    }

    /// Returns the wrapped client.
    pub fn inner(&self) -> &Arc<dyn Client> {
        &self.inner
    }

    fn arm(&self, point: FaultPoint, error: DriverError, remaining: Option<u32>) {
        self.state
            .armed
            .lock()
            .insert(point, Fault { error, remaining });
    }
}

impl Client for FaultyClient {
    fn client_id(&self) -> ClientId {
        self.inner.client_id()
    }

    fn database_name(&self) -> &str {
        self.inner.database_name()
    }

    fn collection(&self, name: &str) -> DriverResult<Arc<dyn Collection>> {
        self.state.check(FaultPoint::Collection)?;
        Ok(Arc::new(FaultyCollection {
            inner: self.inner.collection(name)?,
            state: Arc::clone(&self.state),
        }))
    }

    fn start_session(&self) -> DriverResult<Box<dyn Session>> {
        self.state.check(FaultPoint::StartSession)?;
        Ok(Box::new(FaultySession {
            inner: self.inner.start_session()?,
            state: Arc::clone(&self.state),
        }))
    }
}

impl std::fmt::Debug for FaultyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultyClient")
            .field("armed", &self.state.armed.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

struct FaultySession {
    inner: Box<dyn Session>,
    state: Arc<FaultState>,
}

impl Session for FaultySession {
    fn id(&self) -> SessionId {
        self.inner.id()
    }

    fn client_id(&self) -> ClientId {
        self.inner.client_id()
    }

    fn start_transaction(&mut self) -> DriverResult<()> {
        self.state.check(FaultPoint::StartTransaction)?;
        self.inner.start_transaction()
    }

    fn commit_transaction(&mut self) -> DriverResult<()> {
        self.state.check(FaultPoint::Commit)?;
        self.inner.commit_transaction()
    }

    fn abort_transaction(&mut self) -> DriverResult<()> {
        self.state.check(FaultPoint::Abort)?;
        self.inner.abort_transaction()
    }

    fn end_session(&mut self) {
        self.inner.end_session();
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    fn has_ended(&self) -> bool {
        self.inner.has_ended()
    }
}

struct FaultyCollection {
    inner: Arc<dyn Collection>,
    state: Arc<FaultState>,
}

impl Collection for FaultyCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn insert_one(
        &self,
        document: Document,
        session: Option<&dyn Session>,
    ) -> DriverResult<ObjectId> {
        self.state.check(FaultPoint::Operation)?;
        self.inner.insert_one(document, session)
    }

    fn find_one(
        &self,
        filter: &Filter,
        session: Option<&dyn Session>,
    ) -> DriverResult<Option<Document>> {
        self.state.check(FaultPoint::Operation)?;
        self.inner.find_one(filter, session)
    }

    fn find(&self, filter: &Filter, session: Option<&dyn Session>) -> DriverResult<Vec<Document>> {
        self.state.check(FaultPoint::Operation)?;
        self.inner.find(filter, session)
    }

    fn replace_one(
        &self,
        filter: &Filter,
        document: Document,
        session: Option<&dyn Session>,
    ) -> DriverResult<ReplaceResult> {
        self.state.check(FaultPoint::Operation)?;
        self.inner.replace_one(filter, document, session)
    }

    fn delete_one(
        &self,
        filter: &Filter,
        session: Option<&dyn Session>,
    ) -> DriverResult<DeleteResult> {
        self.state.check(FaultPoint::Operation)?;
        self.inner.delete_one(filter, session)
    }
}
