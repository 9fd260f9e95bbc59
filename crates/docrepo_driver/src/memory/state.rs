//! Shared state of the in-memory store.

use crate::error::{DriverError, DriverResult};
use crate::filter::Filter;
use crate::session::SessionId;
use docrepo_document::{Document, ObjectId, ID_FIELD};
use std::collections::{HashMap, HashSet};

/// A committed document and the version that last wrote it.
#[derive(Debug, Clone)]
struct Stored {
    document: Document,
    version: u64,
}

/// Committed documents of one collection, in insertion order.
#[derive(Debug, Default)]
pub(crate) struct CollectionData {
    order: Vec<ObjectId>,
    documents: HashMap<ObjectId, Stored>,
}

impl CollectionData {
    fn get(&self, id: &ObjectId) -> Option<&Stored> {
        self.documents.get(id)
    }

    fn put(&mut self, id: ObjectId, document: Document, version: u64) {
        if self
            .documents
            .insert(id, Stored { document, version })
            .is_none()
        {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: &ObjectId) -> bool {
        if self.documents.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
            true
        } else {
            false
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&ObjectId, &Document)> {
        self.order
            .iter()
            .filter_map(|id| self.documents.get(id).map(|s| (id, &s.document)))
    }

    pub(crate) fn len(&self) -> usize {
        self.documents.len()
    }
}

/// A buffered write inside a transaction.
#[derive(Debug, Clone)]
pub(crate) enum PendingWrite {
    /// Insert or replace a document.
    Put(Document),
    /// Delete a document.
    Delete,
}

type Key = (String, ObjectId);

/// Buffered state of one open transaction.
#[derive(Debug, Default)]
pub(crate) struct TxnState {
    /// Pending writes keyed by (collection, id).
    writes: HashMap<Key, PendingWrite>,
    /// Keys in first-write order, so new documents keep insertion order.
    order: Vec<Key>,
    /// Committed version observed when each key was first written.
    base_versions: HashMap<Key, Option<u64>>,
}

impl TxnState {
    pub(crate) fn write_count(&self) -> usize {
        self.writes.len()
    }
}

/// Everything the in-memory store keeps behind its lock.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    collections: HashMap<String, CollectionData>,
    transactions: HashMap<SessionId, TxnState>,
    sessions: HashSet<SessionId>,
    next_version: u64,
}

impl StoreState {
    fn bump_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    pub(crate) fn ensure_collection(&mut self, name: &str) {
        self.collections.entry(name.to_string()).or_default();
    }

    pub(crate) fn drop_collection(&mut self, name: &str) -> bool {
        self.collections.remove(name).is_some()
    }

    pub(crate) fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn committed_len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, CollectionData::len)
    }

    // === Sessions ===

    pub(crate) fn register_session(&mut self, session: SessionId) {
        self.sessions.insert(session);
    }

    pub(crate) fn release_session(&mut self, session: SessionId) {
        self.sessions.remove(&session);
    }

    pub(crate) fn knows_session(&self, session: SessionId) -> bool {
        self.sessions.contains(&session)
    }

    // === Transactions ===

    pub(crate) fn begin(&mut self, session: SessionId) -> DriverResult<()> {
        if self.transactions.contains_key(&session) {
            return Err(DriverError::transaction("transaction already in progress"));
        }
        self.transactions.insert(session, TxnState::default());
        Ok(())
    }

    pub(crate) fn has_transaction(&self, session: SessionId) -> bool {
        self.transactions.contains_key(&session)
    }

    pub(crate) fn transaction(&self, session: SessionId) -> Option<&TxnState> {
        self.transactions.get(&session)
    }

    /// Discards the transaction's writes.
    pub(crate) fn abort(&mut self, session: SessionId) -> DriverResult<usize> {
        self.transactions
            .remove(&session)
            .map(|txn| txn.write_count())
            .ok_or_else(|| DriverError::transaction("no transaction in progress"))
    }

    /// Applies the transaction's writes atomically.
    ///
    /// The transaction is closed whether or not the commit succeeds.
    pub(crate) fn commit(&mut self, session: SessionId) -> DriverResult<usize> {
        let txn = self
            .transactions
            .remove(&session)
            .ok_or_else(|| DriverError::transaction("no transaction in progress"))?;

        // Every key must still be at the version the transaction saw.
        for (key, base) in &txn.base_versions {
            let current = self
                .collections
                .get(&key.0)
                .and_then(|c| c.get(&key.1))
                .map(|s| s.version);
            if current != *base {
                return Err(DriverError::WriteConflict {
                    collection: key.0.clone(),
                    id: key.1,
                });
            }
        }

        let version = self.bump_version();
        for key in &txn.order {
            let Some(write) = txn.writes.get(key) else {
                continue;
            };
            let data = self.collections.entry(key.0.clone()).or_default();
            match write {
                PendingWrite::Put(document) => data.put(key.1, document.clone(), version),
                PendingWrite::Delete => {
                    data.remove(&key.1);
                }
            }
        }

        Ok(txn.write_count())
    }

    // === Reads ===

    /// Returns documents visible to `session` that match `filter`.
    ///
    /// Reads see committed data overlaid with the session's own pending
    /// writes. Committed documents come first in insertion order, then
    /// documents created by the transaction in creation order.
    pub(crate) fn scan(
        &self,
        collection: &str,
        session: Option<SessionId>,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Vec<Document> {
        let txn = session.and_then(|id| self.transactions.get(&id));
        let limit = limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();

        if let Some(data) = self.collections.get(collection) {
            for (id, document) in data.iter() {
                if out.len() >= limit {
                    return out;
                }
                let pending = txn.and_then(|t| t.writes.get(&(collection.to_string(), *id)));
                let visible = match pending {
                    Some(PendingWrite::Put(pending)) => Some(pending),
                    Some(PendingWrite::Delete) => None,
                    None => Some(document),
                };
                if let Some(document) = visible.filter(|d| filter.matches(d)) {
                    out.push(document.clone());
                }
            }
        }

        if let Some(txn) = txn {
            let committed = self.collections.get(collection);
            for key in txn.order.iter().filter(|k| k.0 == collection) {
                if out.len() >= limit {
                    break;
                }
                if committed.is_some_and(|c| c.get(&key.1).is_some()) {
                    continue;
                }
                if let Some(PendingWrite::Put(document)) = txn.writes.get(key) {
                    if filter.matches(document) {
                        out.push(document.clone());
                    }
                }
            }
        }

        out
    }

    fn first_visible_id(
        &self,
        collection: &str,
        session: Option<SessionId>,
        filter: &Filter,
    ) -> Option<ObjectId> {
        self.scan(collection, session, filter, Some(1))
            .first()
            .and_then(Document::id)
    }

    // === Writes ===

    pub(crate) fn insert(
        &mut self,
        collection: &str,
        session: Option<SessionId>,
        mut document: Document,
    ) -> DriverResult<ObjectId> {
        let id = match document.id() {
            Some(id) => id,
            None => {
                if document.contains_key(ID_FIELD) {
                    return Err(DriverError::operation("_id must be an object id"));
                }
                let id = ObjectId::new();
                document.insert(ID_FIELD, id);
                id
            }
        };

        if self
            .first_visible_id(collection, session, &Filter::by_id(id))
            .is_some()
        {
            return Err(DriverError::DuplicateKey {
                collection: collection.to_string(),
                id,
            });
        }

        self.write(collection, session, id, PendingWrite::Put(document));
        Ok(id)
    }

    pub(crate) fn replace(
        &mut self,
        collection: &str,
        session: Option<SessionId>,
        filter: &Filter,
        mut document: Document,
    ) -> DriverResult<bool> {
        let Some(id) = self.first_visible_id(collection, session, filter) else {
            return Ok(false);
        };

        match document.get(ID_FIELD) {
            None => {
                document.insert(ID_FIELD, id);
            }
            Some(value) if value.as_object_id() == Some(id) => {}
            Some(_) => {
                return Err(DriverError::operation("the _id field is immutable"));
            }
        }

        self.write(collection, session, id, PendingWrite::Put(document));
        Ok(true)
    }

    pub(crate) fn delete(
        &mut self,
        collection: &str,
        session: Option<SessionId>,
        filter: &Filter,
    ) -> bool {
        match self.first_visible_id(collection, session, filter) {
            Some(id) => {
                self.write(collection, session, id, PendingWrite::Delete);
                true
            }
            None => false,
        }
    }

    /// Routes a write into the session's transaction, or applies it directly.
    fn write(
        &mut self,
        collection: &str,
        session: Option<SessionId>,
        id: ObjectId,
        write: PendingWrite,
    ) {
        let key = (collection.to_string(), id);
        let base = self
            .collections
            .get(collection)
            .and_then(|c| c.get(&id))
            .map(|s| s.version);

        if let Some(txn) = session.and_then(|s| self.transactions.get_mut(&s)) {
            if !txn.base_versions.contains_key(&key) {
                txn.base_versions.insert(key.clone(), base);
                txn.order.push(key.clone());
            }
            txn.writes.insert(key, write);
            return;
        }

        let version = self.bump_version();
        let data = self.collections.entry(key.0).or_default();
        match write {
            PendingWrite::Put(document) => data.put(id, document, version),
            PendingWrite::Delete => {
                data.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrepo_document::doc;

    #[test]
    fn direct_insert_and_scan() {
        let mut state = StoreState::default();
        let id = state.insert("people", None, doc! { "name" => "Ada" }).unwrap();

        let all = state.scan("people", None, &Filter::all(), None);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id(), Some(id));
    }

    #[test]
    fn scan_preserves_insertion_order() {
        let mut state = StoreState::default();
        for i in 0..5 {
            state.insert("n", None, doc! { "i" => i }).unwrap();
        }
        let values: Vec<i64> = state
            .scan("n", None, &Filter::all(), None)
            .iter()
            .map(|d| d.get_i64("i").unwrap())
            .collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn transaction_writes_are_private_until_commit() {
        let mut state = StoreState::default();
        let session = SessionId::new();
        state.begin(session).unwrap();

        state
            .insert("people", Some(session), doc! { "name" => "Ada" })
            .unwrap();

        assert_eq!(
            state.scan("people", Some(session), &Filter::all(), None).len(),
            1
        );
        assert_eq!(state.scan("people", None, &Filter::all(), None).len(), 0);

        assert_eq!(state.commit(session).unwrap(), 1);
        assert_eq!(state.scan("people", None, &Filter::all(), None).len(), 1);
        assert!(!state.has_transaction(session));
    }

    #[test]
    fn abort_discards_writes() {
        let mut state = StoreState::default();
        let id = state.insert("people", None, doc! { "name" => "Ada" }).unwrap();

        let session = SessionId::new();
        state.begin(session).unwrap();
        state
            .replace(
                "people",
                Some(session),
                &Filter::by_id(id),
                doc! { "name" => "Grace" },
            )
            .unwrap();
        state.delete("people", Some(session), &Filter::eq("name", "Grace"));
        assert!(state.scan("people", Some(session), &Filter::all(), None).is_empty());

        state.abort(session).unwrap();
        let all = state.scan("people", None, &Filter::all(), None);
        assert_eq!(all[0].get_str("name").unwrap(), "Ada");
    }

    #[test]
    fn begin_twice_fails() {
        let mut state = StoreState::default();
        let session = SessionId::new();
        state.begin(session).unwrap();
        assert!(matches!(
            state.begin(session),
            Err(DriverError::Transaction { .. })
        ));
    }

    #[test]
    fn commit_without_transaction_fails() {
        let mut state = StoreState::default();
        assert!(state.commit(SessionId::new()).is_err());
        assert!(state.abort(SessionId::new()).is_err());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut state = StoreState::default();
        let id = ObjectId::new();
        state.insert("c", None, doc! { ID_FIELD => id }).unwrap();
        let result = state.insert("c", None, doc! { ID_FIELD => id });
        assert!(matches!(result, Err(DriverError::DuplicateKey { .. })));
    }

    #[test]
    fn concurrent_write_conflicts_at_commit() {
        let mut state = StoreState::default();
        let id = state.insert("c", None, doc! { "v" => 0 }).unwrap();

        let first = SessionId::new();
        let second = SessionId::new();
        state.begin(first).unwrap();
        state.begin(second).unwrap();

        state
            .replace("c", Some(first), &Filter::by_id(id), doc! { "v" => 1 })
            .unwrap();
        state
            .replace("c", Some(second), &Filter::by_id(id), doc! { "v" => 2 })
            .unwrap();

        state.commit(first).unwrap();
        let result = state.commit(second);
        assert!(matches!(result, Err(DriverError::WriteConflict { .. })));
        assert!(!state.has_transaction(second));

        let all = state.scan("c", None, &Filter::all(), None);
        assert_eq!(all[0].get_i64("v").unwrap(), 1);
    }

    #[test]
    fn replace_cannot_change_id() {
        let mut state = StoreState::default();
        let id = state.insert("c", None, doc! { "v" => 0 }).unwrap();
        let result = state.replace(
            "c",
            None,
            &Filter::by_id(id),
            doc! { ID_FIELD => ObjectId::new(), "v" => 1 },
        );
        assert!(matches!(result, Err(DriverError::Operation { .. })));
    }

    #[test]
    fn replace_and_delete_miss_are_noops() {
        let mut state = StoreState::default();
        let filter = Filter::by_id(ObjectId::new());
        assert!(!state.replace("c", None, &filter, doc! { "v" => 1 }).unwrap());
        assert!(!state.delete("c", None, &filter));
    }
}
