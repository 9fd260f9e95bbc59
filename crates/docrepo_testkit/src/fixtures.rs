//! Test fixtures and store helpers.
//!
//! Provides a sample entity and ready-made in-memory databases, with or
//! without fault injection.

use crate::faults::FaultyClient;
use docrepo_core::{impl_serde_entity, Database, ObjectId, Repository};
use docrepo_driver::InMemoryClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Sample entity stored in the `people` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Store-assigned identity.
    #[serde(skip)]
    pub id: Option<ObjectId>,
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: i64,
    /// Optional contact address.
    pub email: Option<String>,
    /// Free-form labels.
    pub tags: Vec<String>,
}

impl_serde_entity!(Person, "people", id);

impl Person {
    /// Creates an unsaved person with no email or tags.
    pub fn new(name: impl Into<String>, age: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            age,
            email: None,
            tags: Vec::new(),
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A test database over an in-memory store.
pub struct TestStore {
    /// The database instance.
    pub db: Database,
    /// The backing store, for inspection and reachability control.
    pub store: InMemoryClient,
    /// The fault-injecting wrapper, when the store was opened with faults.
    pub faults: Option<FaultyClient>,
}

impl TestStore {
    /// Creates a fresh in-memory test database.
    pub fn memory() -> Self {
        let store = InMemoryClient::new("test");
        Self {
            db: Database::new(Arc::new(store.clone())),
            store,
            faults: None,
        }
    }

    /// Creates a fresh test database whose driver calls can be failed.
    pub fn with_faults() -> Self {
        let store = InMemoryClient::new("test");
        let faults = FaultyClient::new(Arc::new(store.clone()));
        Self {
            db: Database::new(Arc::new(faults.clone())),
            store,
            faults: Some(faults),
        }
    }

    /// Returns the fault injector.
    ///
    /// # Panics
    ///
    /// Panics if the store was not opened with [`TestStore::with_faults`].
    pub fn faults(&self) -> &FaultyClient {
        self.faults
            .as_ref()
            .expect("store was opened without fault injection")
    }

    /// Returns the shared `Person` repository.
    ///
    /// # Panics
    ///
    /// Panics if the repository cannot be constructed.
    pub fn people(&self) -> Arc<Repository<Person>> {
        self.db
            .repository::<Repository<Person>>()
            .expect("failed to construct person repository")
    }

    /// Creates each person and returns them with identities assigned.
    ///
    /// # Panics
    ///
    /// Panics if any insert fails.
    pub fn seed(&self, people: impl IntoIterator<Item = Person>) -> Vec<Person> {
        let repository = self.people();
        people
            .into_iter()
            .map(|mut person| {
                repository.create(&mut person).expect("failed to seed person");
                person
            })
            .collect()
    }

    /// Returns the number of committed people.
    pub fn committed_people(&self) -> usize {
        self.store.document_count("people")
    }
}

impl std::ops::Deref for TestStore {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a fresh in-memory test store.
///
/// # Example
///
/// ```rust
/// use docrepo_testkit::{with_test_store, Person};
///
/// with_test_store(|store| {
///     let people = store.people();
///     people.create(&mut Person::new("Ada", 36)).unwrap();
///     assert_eq!(people.count().unwrap(), 1);
/// });
/// ```
pub fn with_test_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::memory();
    f(&store)
}

/// A small fixed cast of people for scenario tests.
pub fn sample_people() -> Vec<Person> {
    vec![
        Person::new("Ada", 36).with_email("ada@example.com").with_tag("math"),
        Person::new("Grace", 45).with_tag("navy").with_tag("cobol"),
        Person::new("Linus", 28),
        Person::new("Ada", 52).with_tag("math"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_is_empty() {
        let store = TestStore::memory();
        assert_eq!(store.people().count().unwrap(), 0);
        assert!(store.faults.is_none());
    }

    #[test]
    fn seed_assigns_identities() {
        let store = TestStore::memory();
        let seeded = store.seed(sample_people());
        assert!(seeded.iter().all(|p| p.id.is_some()));
        assert_eq!(store.committed_people(), 4);
    }

    #[test]
    fn faulty_store_shares_backing_store() {
        let store = TestStore::with_faults();
        store.seed([Person::new("Ada", 36)]);
        assert_eq!(store.committed_people(), 1);
        assert!(store.faults().calls(crate::FaultPoint::Commit) >= 1);
    }

    #[test]
    fn people_repository_is_shared() {
        let store = TestStore::memory();
        assert!(Arc::ptr_eq(&store.people(), &store.people()));
    }
}
