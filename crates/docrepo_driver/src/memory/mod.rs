//! In-memory driver.
//!
//! A single-process stand-in for a replica-set document store. It keeps
//! every collection behind one lock and supports multi-document
//! transactions with snapshot-free optimistic conflict detection: a
//! transaction records the committed version of each document it writes
//! and fails at commit if any of them moved.
//!
//! The store can be marked unreachable to exercise connectivity failures.

mod collection;
mod session;
mod state;

pub use collection::InMemoryCollection;
pub use session::InMemorySession;

use crate::client::{Client, ClientId, Connector};
use crate::collection::Collection;
use crate::error::{DriverError, DriverResult};
use crate::session::{Session, SessionId};
use parking_lot::RwLock;
use state::StoreState;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// URI scheme accepted by [`InMemoryConnector`].
pub const URI_SCHEME: &str = "mongodb://";

const DEFAULT_SELECTION_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) struct Shared {
    id: ClientId,
    database: String,
    state: RwLock<StoreState>,
    reachable: AtomicBool,
    selection_timeout: Duration,
    sessions_started: AtomicU64,
    open_sessions: AtomicUsize,
}

impl Shared {
    fn check_reachable(&self) -> DriverResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DriverError::ServerSelectionTimeout {
                timeout: self.selection_timeout,
            })
        }
    }
}

/// A client over an in-process document store.
///
/// Clones share the same store.
///
/// # Example
///
/// ```
/// use docrepo_document::doc;
/// use docrepo_driver::{Client, Filter, InMemoryClient};
///
/// let client = InMemoryClient::new("app");
/// let people = client.collection("people").unwrap();
/// people.insert_one(doc! { "name" => "Ada" }, None).unwrap();
///
/// let found = people.find(&Filter::eq("name", "Ada"), None).unwrap();
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Clone)]
pub struct InMemoryClient {
    shared: Arc<Shared>,
}

impl InMemoryClient {
    /// Creates an empty store bound to `database`.
    pub fn new(database: impl Into<String>) -> Self {
        Self::with_selection_timeout(database, DEFAULT_SELECTION_TIMEOUT)
    }

    /// Creates an empty store reporting `timeout` when unreachable.
    pub fn with_selection_timeout(database: impl Into<String>, timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: ClientId::new(),
                database: database.into(),
                state: RwLock::new(StoreState::default()),
                reachable: AtomicBool::new(true),
                selection_timeout: timeout,
                sessions_started: AtomicU64::new(0),
                open_sessions: AtomicUsize::new(0),
            }),
        }
    }

    /// Marks the store reachable or unreachable.
    ///
    /// While unreachable, every session and collection operation fails
    /// with [`DriverError::ServerSelectionTimeout`]. Aborts and session
    /// ends still succeed so cleanup paths can run.
    pub fn set_reachable(&self, reachable: bool) {
        debug!(database = %self.shared.database, reachable, "store reachability changed");
        self.shared.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Returns whether the store is reachable.
    pub fn is_reachable(&self) -> bool {
        self.shared.reachable.load(Ordering::SeqCst)
    }

    /// Creates an empty collection if it does not exist yet.
    pub fn create_collection(&self, name: &str) {
        self.shared.state.write().ensure_collection(name);
    }

    /// Drops a collection and all its committed documents.
    ///
    /// Returns true if the collection existed.
    pub fn drop_collection(&self, name: &str) -> bool {
        self.shared.state.write().drop_collection(name)
    }

    /// Returns the names of existing collections, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        self.shared.state.read().collection_names()
    }

    /// Returns the number of committed documents in a collection.
    pub fn document_count(&self, collection: &str) -> usize {
        self.shared.state.read().committed_len(collection)
    }

    /// Returns the number of writes buffered by a session's open
    /// transaction, or `None` if it has none.
    pub fn pending_writes(&self, session: SessionId) -> Option<usize> {
        self.shared
            .state
            .read()
            .transaction(session)
            .map(state::TxnState::write_count)
    }

    /// Returns how many sessions this store has handed out.
    pub fn sessions_started(&self) -> u64 {
        self.shared.sessions_started.load(Ordering::SeqCst)
    }

    /// Returns how many sessions are started and not yet ended.
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::SeqCst)
    }
}

impl Client for InMemoryClient {
    fn client_id(&self) -> ClientId {
        self.shared.id
    }

    fn database_name(&self) -> &str {
        &self.shared.database
    }

    fn collection(&self, name: &str) -> DriverResult<Arc<dyn Collection>> {
        self.shared.check_reachable()?;
        Ok(Arc::new(InMemoryCollection::new(
            name.to_string(),
            Arc::clone(&self.shared),
        )))
    }

    fn start_session(&self) -> DriverResult<Box<dyn Session>> {
        self.shared.check_reachable()?;
        Ok(Box::new(InMemorySession::new(Arc::clone(&self.shared))))
    }
}

impl std::fmt::Debug for InMemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryClient")
            .field("database", &self.shared.database)
            .field("reachable", &self.is_reachable())
            .finish_non_exhaustive()
    }
}

/// Connector producing a fresh [`InMemoryClient`] per call.
///
/// Only the URI scheme is checked; host and credentials are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryConnector;

impl Connector for InMemoryConnector {
    fn connect(uri: &str, database: &str) -> DriverResult<Arc<dyn Client>> {
        if !uri.starts_with(URI_SCHEME) {
            return Err(DriverError::connection(format!(
                "unsupported connection URI, expected {URI_SCHEME}..."
            )));
        }
        if database.is_empty() {
            return Err(DriverError::connection("database name must not be empty"));
        }
        debug!(database, "connected in-memory client");
        Ok(Arc::new(InMemoryClient::new(database)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ReplaceResult;
    use crate::filter::Filter;
    use docrepo_document::doc;

    #[test]
    fn session_transaction_commit() {
        let client = InMemoryClient::new("test");
        let people = client.collection("people").unwrap();
        let mut session = client.start_session().unwrap();

        session.start_transaction().unwrap();
        assert!(session.in_transaction());
        people
            .insert_one(doc! { "name" => "Ada" }, Some(&*session))
            .unwrap();
        assert_eq!(client.pending_writes(session.id()), Some(1));
        assert_eq!(client.document_count("people"), 0);

        session.commit_transaction().unwrap();
        assert!(!session.in_transaction());
        assert_eq!(client.document_count("people"), 1);
    }

    #[test]
    fn session_reads_own_writes() {
        let client = InMemoryClient::new("test");
        let people = client.collection("people").unwrap();
        let mut session = client.start_session().unwrap();
        session.start_transaction().unwrap();

        let id = people
            .insert_one(doc! { "name" => "Ada" }, Some(&*session))
            .unwrap();

        let inside = people
            .find_one(&Filter::by_id(id), Some(&*session))
            .unwrap();
        assert!(inside.is_some());
        assert!(people.find_one(&Filter::by_id(id), None).unwrap().is_none());
    }

    #[test]
    fn session_abort_discards() {
        let client = InMemoryClient::new("test");
        let people = client.collection("people").unwrap();
        let mut session = client.start_session().unwrap();

        session.start_transaction().unwrap();
        people
            .insert_one(doc! { "name" => "Ada" }, Some(&*session))
            .unwrap();
        session.abort_transaction().unwrap();

        assert!(people.find(&Filter::all(), None).unwrap().is_empty());
    }

    #[test]
    fn end_session_aborts_open_transaction() {
        let client = InMemoryClient::new("test");
        let people = client.collection("people").unwrap();
        let mut session = client.start_session().unwrap();
        assert_eq!(client.open_sessions(), 1);

        session.start_transaction().unwrap();
        people
            .insert_one(doc! { "name" => "Ada" }, Some(&*session))
            .unwrap();
        session.end_session();
        session.end_session();

        assert!(session.has_ended());
        assert_eq!(client.open_sessions(), 0);
        assert_eq!(client.document_count("people"), 0);
        assert_eq!(
            session.start_transaction(),
            Err(DriverError::SessionEnded)
        );
    }

    #[test]
    fn ended_session_is_rejected_by_collections() {
        let client = InMemoryClient::new("test");
        let people = client.collection("people").unwrap();
        let mut session = client.start_session().unwrap();
        session.end_session();

        let result = people.find(&Filter::all(), Some(&*session));
        assert_eq!(result, Err(DriverError::SessionEnded));
    }

    #[test]
    fn dropped_session_is_ended() {
        let client = InMemoryClient::new("test");
        {
            let _session = client.start_session().unwrap();
            assert_eq!(client.open_sessions(), 1);
        }
        assert_eq!(client.open_sessions(), 0);
        assert_eq!(client.sessions_started(), 1);
    }

    #[test]
    fn unreachable_store_times_out() {
        let client = InMemoryClient::with_selection_timeout("test", Duration::from_millis(5));
        let people = client.collection("people").unwrap();
        let mut session = client.start_session().unwrap();
        session.start_transaction().unwrap();

        client.set_reachable(false);
        let timeout = DriverError::ServerSelectionTimeout {
            timeout: Duration::from_millis(5),
        };
        assert_eq!(client.start_session().err(), Some(timeout.clone()));
        assert_eq!(people.find(&Filter::all(), None), Err(timeout.clone()));
        assert_eq!(session.commit_transaction(), Err(timeout));

        // Cleanup still works.
        session.abort_transaction().unwrap();
        session.end_session();

        client.set_reachable(true);
        assert!(people.find(&Filter::all(), None).unwrap().is_empty());
    }

    #[test]
    fn replace_and_delete_results() {
        let client = InMemoryClient::new("test");
        let people = client.collection("people").unwrap();
        let id = people.insert_one(doc! { "name" => "Ada" }, None).unwrap();

        let replaced = people
            .replace_one(&Filter::by_id(id), doc! { "name" => "Grace" }, None)
            .unwrap();
        assert_eq!(replaced, ReplaceResult { matched: 1, modified: 1 });

        let missing = people
            .replace_one(&Filter::eq("name", "Nobody"), doc! {}, None)
            .unwrap();
        assert_eq!(missing.matched, 0);

        assert_eq!(people.delete_one(&Filter::by_id(id), None).unwrap().deleted, 1);
        assert_eq!(people.delete_one(&Filter::by_id(id), None).unwrap().deleted, 0);
    }

    #[test]
    fn collection_management() {
        let client = InMemoryClient::new("test");
        client.create_collection("b");
        client
            .collection("a")
            .unwrap()
            .insert_one(doc! {}, None)
            .unwrap();
        assert_eq!(client.collection_names(), vec!["a", "b"]);

        assert!(client.drop_collection("a"));
        assert!(!client.drop_collection("a"));
        assert_eq!(client.collection_names(), vec!["b"]);
    }

    #[test]
    fn clones_share_the_store() {
        let client = InMemoryClient::new("test");
        let other = client.clone();
        client
            .collection("c")
            .unwrap()
            .insert_one(doc! {}, None)
            .unwrap();
        assert_eq!(other.document_count("c"), 1);
    }

    #[test]
    fn connector_checks_scheme() {
        let client = InMemoryConnector::connect("mongodb://localhost:27017/app", "app").unwrap();
        assert_eq!(client.database_name(), "app");

        let err = InMemoryConnector::connect("http://localhost", "app").err();
        assert!(matches!(err, Some(DriverError::Connection { .. })));

        let err = InMemoryConnector::connect("mongodb://localhost", "").err();
        assert!(matches!(err, Some(DriverError::Connection { .. })));
    }

    #[test]
    fn foreign_session_is_rejected() {
        let home = InMemoryClient::new("home");
        let other = InMemoryClient::new("other");
        assert_ne!(home.client_id(), other.client_id());
        assert_eq!(home.client_id(), home.clone().client_id());

        let mut session = home.start_session().unwrap();
        assert_eq!(session.client_id(), home.client_id());
        session.start_transaction().unwrap();

        let people = other.collection("people").unwrap();
        let result = people.insert_one(doc! { "name" => "Ghost" }, Some(&*session));
        assert!(matches!(result, Err(DriverError::Transaction { .. })));
        assert!(matches!(
            people.find(&Filter::all(), Some(&*session)),
            Err(DriverError::Transaction { .. })
        ));
        assert_eq!(other.document_count("people"), 0);
    }
}
