//! Property tests for repository CRUD.

use docrepo_core::{Document, Filter, ObjectId};
use docrepo_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn create_assigns_identity_and_round_trips(person in person_strategy()) {
        let store = TestStore::memory();
        let people = store.people();

        let mut created = person.clone();
        let id = people.create(&mut created).unwrap();

        prop_assert_eq!(created.id, Some(id));
        let found = people.find_by_id(id).unwrap().unwrap();
        prop_assert_eq!(&found, &created);

        let mut expected = person;
        expected.id = Some(id);
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn identities_are_distinct(batch in people_strategy(12)) {
        let store = TestStore::memory();
        let seeded = store.seed(batch.clone());

        let mut ids: Vec<ObjectId> = seeded.iter().filter_map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), batch.len());
    }

    #[test]
    fn attribute_filter_is_subset_of_find_all(
        batch in people_strategy(16),
        criteria in person_criteria_strategy(),
    ) {
        let store = TestStore::memory();
        store.seed(batch);
        let people = store.people();

        let all = people.find_all().unwrap();
        let filter = Filter::from(criteria.clone());
        let expected: Vec<Person> = all
            .iter()
            .filter(|p| {
                criteria.get("name").map_or(true, |n| n.as_text() == Some(p.name.as_str()))
                    && criteria.get("age").map_or(true, |a| a.as_integer() == Some(p.age))
            })
            .cloned()
            .collect();

        prop_assert_eq!(people.find_by_attributes(filter).unwrap(), expected);
    }

    #[test]
    fn empty_criteria_equals_find_all(batch in people_strategy(10)) {
        let store = TestStore::memory();
        store.seed(batch);
        let people = store.people();

        prop_assert_eq!(
            people.find_by_attributes(Document::new()).unwrap(),
            people.find_all().unwrap()
        );
    }

    #[test]
    fn delete_is_idempotent(person in person_strategy()) {
        let store = TestStore::memory();
        let people = store.people();
        let mut person = person;
        let id = people.create(&mut person).unwrap();

        prop_assert!(people.delete(&person).unwrap());
        prop_assert!(!people.delete(&person).unwrap());
        prop_assert_eq!(people.find_by_id(id).unwrap(), None);
    }

    #[test]
    fn update_is_full_replace(person in person_strategy(), email in "[a-z]{3}@example\\.com") {
        let store = TestStore::memory();
        let people = store.people();
        let mut person = person.with_email(email).with_tag("extra");
        let id = people.create(&mut person).unwrap();

        person.email = None;
        person.tags.clear();
        prop_assert!(people.update(&person).unwrap());

        let stored = people.find_by_id(id).unwrap().unwrap();
        prop_assert_eq!(stored.email, None);
        prop_assert!(stored.tags.is_empty());
    }
}
