//! Collection trait definition.

use crate::error::DriverResult;
use crate::filter::Filter;
use crate::session::Session;
use docrepo_document::{Document, ObjectId};

/// Outcome of a `replace_one` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceResult {
    /// Number of documents that matched the filter (0 or 1).
    pub matched: u64,
    /// Number of documents actually replaced (0 or 1).
    pub modified: u64,
}

/// Outcome of a `delete_one` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteResult {
    /// Number of documents removed (0 or 1).
    pub deleted: u64,
}

/// A handle to one named collection of documents.
///
/// Every operation accepts an optional session. With a session that has
/// an active transaction the operation joins that transaction; without
/// one it is applied on its own.
///
/// # Implementors
///
/// - [`crate::InMemoryClient`] collections - for tests and embedding
pub trait Collection: Send + Sync {
    /// Returns the collection name.
    fn name(&self) -> &str;

    /// Inserts one document.
    ///
    /// If the document has no `_id`, the store assigns one. Returns the
    /// identity of the inserted document.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if a document with the same `_id` exists.
    fn insert_one(&self, document: Document, session: Option<&dyn Session>)
        -> DriverResult<ObjectId>;

    /// Returns the first document matching `filter`, if any.
    fn find_one(&self, filter: &Filter, session: Option<&dyn Session>)
        -> DriverResult<Option<Document>>;

    /// Returns every document matching `filter`, in store order.
    fn find(&self, filter: &Filter, session: Option<&dyn Session>) -> DriverResult<Vec<Document>>;

    /// Replaces the first document matching `filter` with `document`.
    ///
    /// The replaced document keeps its `_id`. A miss is not an error.
    fn replace_one(
        &self,
        filter: &Filter,
        document: Document,
        session: Option<&dyn Session>,
    ) -> DriverResult<ReplaceResult>;

    /// Deletes the first document matching `filter`. A miss is not an error.
    fn delete_one(&self, filter: &Filter, session: Option<&dyn Session>)
        -> DriverResult<DeleteResult>;
}
