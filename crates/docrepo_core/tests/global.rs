//! Process-wide default database.

use docrepo_core::{CoreError, Database, Repository};
use docrepo_testkit::Person;
use std::sync::Arc;

#[test]
fn global_database_installs_once() {
    assert!(Database::global().is_none());

    let installed = Database::install_global(Database::open_in_memory("global")).unwrap();
    let fetched = Database::global().unwrap();
    assert!(Arc::ptr_eq(&installed, &fetched));

    let again = Database::install_global(Database::open_in_memory("other"));
    assert!(matches!(again, Err(CoreError::Config(_))));
    assert_eq!(Database::global().unwrap().client().database_name(), "global");

    let people = fetched.repository::<Repository<Person>>().unwrap();
    people.create(&mut Person::new("Ada", 36)).unwrap();
    let from_other_thread = std::thread::spawn(|| {
        let db = Database::global().unwrap();
        db.repository::<Repository<Person>>().unwrap().count().unwrap()
    })
    .join()
    .unwrap();
    assert_eq!(from_other_thread, 1);
}
