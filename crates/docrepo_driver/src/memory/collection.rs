//! In-memory collection handle.

use super::Shared;
use crate::collection::{Collection, DeleteResult, ReplaceResult};
use crate::error::{DriverError, DriverResult};
use crate::filter::Filter;
use crate::session::{Session, SessionId};
use docrepo_document::{Document, ObjectId};
use std::sync::Arc;

/// A collection on an [`super::InMemoryClient`].
pub struct InMemoryCollection {
    name: String,
    shared: Arc<Shared>,
}

impl InMemoryCollection {
    pub(crate) fn new(name: String, shared: Arc<Shared>) -> Self {
        Self { name, shared }
    }

    /// Checks reachability and resolves the session to its ID.
    ///
    /// A session this store never started is rejected, so its writes can
    /// never slip past a transaction as direct writes.
    fn prepare(&self, session: Option<&dyn Session>) -> DriverResult<Option<SessionId>> {
        self.shared.check_reachable()?;
        match session {
            Some(s) if s.has_ended() => Err(DriverError::SessionEnded),
            Some(s) if !self.shared.state.read().knows_session(s.id()) => Err(
                DriverError::transaction(format!("session {} belongs to another client", s.id())),
            ),
            Some(s) => Ok(Some(s.id())),
            None => Ok(None),
        }
    }
}

impl Collection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert_one(
        &self,
        document: Document,
        session: Option<&dyn Session>,
    ) -> DriverResult<ObjectId> {
        let session = self.prepare(session)?;
        self.shared
            .state
            .write()
            .insert(&self.name, session, document)
    }

    fn find_one(
        &self,
        filter: &Filter,
        session: Option<&dyn Session>,
    ) -> DriverResult<Option<Document>> {
        let session = self.prepare(session)?;
        Ok(self
            .shared
            .state
            .read()
            .scan(&self.name, session, filter, Some(1))
            .into_iter()
            .next())
    }

    fn find(&self, filter: &Filter, session: Option<&dyn Session>) -> DriverResult<Vec<Document>> {
        let session = self.prepare(session)?;
        Ok(self
            .shared
            .state
            .read()
            .scan(&self.name, session, filter, None))
    }

    fn replace_one(
        &self,
        filter: &Filter,
        document: Document,
        session: Option<&dyn Session>,
    ) -> DriverResult<ReplaceResult> {
        let session = self.prepare(session)?;
        let matched = self
            .shared
            .state
            .write()
            .replace(&self.name, session, filter, document)?;
        let count = u64::from(matched);
        Ok(ReplaceResult {
            matched: count,
            modified: count,
        })
    }

    fn delete_one(
        &self,
        filter: &Filter,
        session: Option<&dyn Session>,
    ) -> DriverResult<DeleteResult> {
        let session = self.prepare(session)?;
        let deleted = self
            .shared
            .state
            .write()
            .delete(&self.name, session, filter);
        Ok(DeleteResult {
            deleted: u64::from(deleted),
        })
    }
}

impl std::fmt::Debug for InMemoryCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCollection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
