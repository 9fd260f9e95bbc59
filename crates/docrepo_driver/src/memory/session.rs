//! In-memory session.

use super::Shared;
use crate::client::ClientId;
use crate::error::{DriverError, DriverResult};
use crate::session::{Session, SessionId};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::trace;

/// A session on an [`super::InMemoryClient`].
///
/// Transaction state lives in the shared store, keyed by session ID, so
/// collections can find it from the ID alone.
pub struct InMemorySession {
    id: SessionId,
    shared: Arc<Shared>,
    ended: bool,
}

impl InMemorySession {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        shared.open_sessions.fetch_add(1, Ordering::SeqCst);
        shared.sessions_started.fetch_add(1, Ordering::SeqCst);
        let id = SessionId::new();
        shared.state.write().register_session(id);
        Self {
            id,
            shared,
            ended: false,
        }
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.ended {
            return Err(DriverError::SessionEnded);
        }
        self.shared.check_reachable()
    }
}

impl Session for InMemorySession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn client_id(&self) -> ClientId {
        self.shared.id
    }

    fn start_transaction(&mut self) -> DriverResult<()> {
        self.ensure_open()?;
        self.shared.state.write().begin(self.id)?;
        trace!(session = %self.id, "transaction started");
        Ok(())
    }

    fn commit_transaction(&mut self) -> DriverResult<()> {
        self.ensure_open()?;
        let writes = self.shared.state.write().commit(self.id)?;
        trace!(session = %self.id, writes, "transaction committed");
        Ok(())
    }

    fn abort_transaction(&mut self) -> DriverResult<()> {
        if self.ended {
            return Err(DriverError::SessionEnded);
        }
        let discarded = self.shared.state.write().abort(self.id)?;
        trace!(session = %self.id, discarded, "transaction aborted");
        Ok(())
    }

    fn end_session(&mut self) {
        if self.ended {
            return;
        }
        let mut state = self.shared.state.write();
        if state.has_transaction(self.id) {
            let _ = state.abort(self.id);
        }
        state.release_session(self.id);
        drop(state);
        self.ended = true;
        self.shared.open_sessions.fetch_sub(1, Ordering::SeqCst);
        trace!(session = %self.id, "session ended");
    }

    fn in_transaction(&self) -> bool {
        !self.ended && self.shared.state.read().has_transaction(self.id)
    }

    fn has_ended(&self) -> bool {
        self.ended
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.end_session();
    }
}

impl std::fmt::Debug for InMemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySession")
            .field("id", &self.id)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}
