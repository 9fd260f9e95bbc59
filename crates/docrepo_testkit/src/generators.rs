//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data that stays within
//! what the document model accepts (no floats, `i64` integers).

use crate::fixtures::Person;
use docrepo_document::{Document, ObjectId, Value};
use proptest::prelude::*;

/// Strategy for generating object IDs.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop::array::uniform12(any::<u8>()).prop_map(ObjectId::from_bytes)
}

/// Strategy for generating valid collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,23}").expect("Invalid regex")
}

/// Strategy for generating field names (never `_id`).
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for generating scalar values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
        object_id_strategy().prop_map(Value::ObjectId),
    ]
}

/// Strategy for generating values, nested up to a few levels.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4)
                .prop_map(|map| Value::Document(map.into_iter().collect())),
        ]
    })
}

/// Strategy for generating documents without an `_id`.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(field_name_strategy(), value_strategy(), 0..8)
        .prop_map(|map| map.into_iter().collect())
}

/// Strategy for generating unsaved people.
///
/// Names and ages come from small pools so attribute queries hit
/// several records.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    (
        prop::sample::select(vec!["Ada", "Grace", "Linus", "Frank", "Barbara"]),
        20i64..25,
        prop::option::of("[a-z]{1,8}@example\\.com"),
        prop::collection::vec(prop::sample::select(vec!["admin", "ops", "dev"]), 0..3),
    )
        .prop_map(|(name, age, email, tags)| Person {
            id: None,
            name: name.to_string(),
            age,
            email,
            tags: tags.into_iter().map(str::to_string).collect(),
        })
}

/// Strategy for generating a batch of unsaved people.
pub fn people_strategy(max: usize) -> impl Strategy<Value = Vec<Person>> {
    prop::collection::vec(person_strategy(), 0..=max)
}

/// Strategy for generating `Person` query criteria over the same pools
/// as [`person_strategy`].
pub fn person_criteria_strategy() -> impl Strategy<Value = Document> {
    (
        prop::option::of(prop::sample::select(vec!["Ada", "Grace", "Linus", "Frank", "Barbara"])),
        prop::option::of(20i64..25),
    )
        .prop_map(|(name, age)| {
            let mut criteria = Document::new();
            if let Some(name) = name {
                criteria.insert("name", name);
            }
            if let Some(age) = age {
                criteria.insert("age", age);
            }
            criteria
        })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrepo_core::validate_collection_name;
    use docrepo_document::ID_FIELD;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn collection_names_are_valid(name in collection_name_strategy()) {
            prop_assert!(validate_collection_name(&name).is_ok());
        }

        #[test]
        fn documents_have_no_identity(document in document_strategy()) {
            prop_assert!(!document.contains_key(ID_FIELD));
        }

        #[test]
        fn people_are_unsaved(person in person_strategy()) {
            prop_assert!(person.id.is_none());
            prop_assert!((20..25).contains(&person.age));
        }

        #[test]
        fn criteria_use_known_fields(criteria in person_criteria_strategy()) {
            prop_assert!(criteria.keys().all(|k| k == "name" || k == "age"));
        }
    }
}
