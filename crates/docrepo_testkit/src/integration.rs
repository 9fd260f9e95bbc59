//! Model-checking harness for repository operation sequences.
//!
//! Applies the same operations to a repository and to a plain in-memory
//! model, then checks that the repository agrees with the model.

use crate::fixtures::{Person, TestStore};
use crate::generators::{object_id_strategy, person_strategy};
use docrepo_core::{ObjectId, Repository};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// One step of a generated workload.
#[derive(Debug, Clone)]
pub enum PersonOperation {
    /// Create a new person.
    Create(Person),
    /// Rename the n-th known person (modulo the known count).
    Rename {
        /// Index into the known identities.
        index: usize,
        /// New name.
        name: String,
    },
    /// Delete the n-th known person (modulo the known count).
    Delete {
        /// Index into the known identities.
        index: usize,
    },
    /// Delete an identity that was never created.
    DeleteUnknown(ObjectId),
}

/// Strategy for generating person operations.
pub fn person_operation_strategy() -> impl Strategy<Value = PersonOperation> {
    prop_oneof![
        3 => person_strategy().prop_map(PersonOperation::Create),
        2 => (any::<usize>(), "[A-Z][a-z]{2,6}")
            .prop_map(|(index, name)| PersonOperation::Rename { index, name }),
        1 => any::<usize>().prop_map(|index| PersonOperation::Delete { index }),
        1 => object_id_strategy().prop_map(PersonOperation::DeleteUnknown),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn person_operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<PersonOperation>> {
    prop::collection::vec(person_operation_strategy(), min_ops..max_ops)
}

/// A repository paired with the state it is expected to hold.
pub struct ModelHarness {
    /// The store under test.
    pub store: TestStore,
    repository: Arc<Repository<Person>>,
    model: HashMap<ObjectId, Person>,
    order: Vec<ObjectId>,
}

impl ModelHarness {
    /// Creates a harness over a fresh in-memory store.
    pub fn new() -> Self {
        let store = TestStore::memory();
        let repository = store.people();
        Self {
            store,
            repository,
            model: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Applies one operation to both the repository and the model.
    ///
    /// # Panics
    ///
    /// Panics if the repository fails or disagrees with the model about
    /// whether the operation hit a record.
    pub fn apply(&mut self, operation: &PersonOperation) {
        match operation {
            PersonOperation::Create(person) => {
                let mut person = person.clone();
                let id = self.repository.create(&mut person).expect("create failed");
                self.model.insert(id, person);
                self.order.push(id);
            }
            PersonOperation::Rename { index, name } => {
                let Some(id) = self.pick(*index) else { return };
                let Some(mut person) = self.model.get(&id).cloned() else { return };
                person.name = name.clone();
                let matched = self.repository.update(&person).expect("update failed");
                assert!(matched, "update missed live record {id}");
                self.model.insert(id, person);
            }
            PersonOperation::Delete { index } => {
                let Some(id) = self.pick(*index) else { return };
                let deleted = self.repository.delete_by_id(id).expect("delete failed");
                assert_eq!(deleted, self.model.remove(&id).is_some());
                self.order.retain(|known| *known != id);
            }
            PersonOperation::DeleteUnknown(id) => {
                let deleted = self.repository.delete_by_id(*id).expect("delete failed");
                assert!(!deleted, "deleted an identity that was never created");
            }
        }
    }

    /// Checks the repository against the model.
    ///
    /// # Panics
    ///
    /// Panics on any disagreement.
    pub fn verify(&self) {
        let stored = self.repository.find_all().expect("find_all failed");
        let stored_ids: Vec<ObjectId> = stored.iter().filter_map(|p| p.id).collect();
        assert_eq!(stored_ids, self.order, "store order differs from creation order");

        for person in &stored {
            let id = person.id.expect("stored person without identity");
            assert_eq!(Some(person), self.model.get(&id), "record {id} differs");
        }
        assert_eq!(self.repository.count().expect("count failed"), self.model.len());
    }

    /// Returns the number of records the model expects.
    pub fn expected_count(&self) -> usize {
        self.model.len()
    }

    fn pick(&self, index: usize) -> Option<ObjectId> {
        if self.order.is_empty() {
            None
        } else {
            Some(self.order[index % self.order.len()])
        }
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::PropTestConfig;
    use crate::fixtures::sample_people;

    #[test]
    fn harness_tracks_fixed_sequence() {
        let mut harness = ModelHarness::new();
        for person in sample_people() {
            harness.apply(&PersonOperation::Create(person));
        }
        harness.apply(&PersonOperation::Rename {
            index: 1,
            name: "Hopper".into(),
        });
        harness.apply(&PersonOperation::Delete { index: 0 });
        harness.apply(&PersonOperation::DeleteUnknown(ObjectId::new()));

        harness.verify();
        assert_eq!(harness.expected_count(), 3);
    }

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn repository_matches_model(ops in person_operation_sequence_strategy(1, 40)) {
            let mut harness = ModelHarness::new();
            for op in &ops {
                harness.apply(op);
            }
            harness.verify();
        }
    }
}
