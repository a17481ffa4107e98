//! Store and Query Scenario Tests
//!
//! Covers:
//! - count after inserts and deletes
//! - filter preserves scan order
//! - limit stops the scan and is applied before sort
//! - sub-databases stay isolated
//! - on-disk stores survive reopen

use depotdb::storage::LOG_FILE_NAME;
use depotdb::{Db, DbError, DbOptions, Key, Query, Storable, StoreLocation};
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    id: i64,
    name: String,
    age: u32,
}

impl Storable for Person {
    fn id(&self) -> Key {
        Key::Int(self.id)
    }
}

fn person(id: i64, age: u32) -> Person {
    Person {
        id,
        name: format!("person-{}", id),
        age,
    }
}

fn memory_db(page: usize) -> Db<Person> {
    Db::open(
        StoreLocation::Memory,
        DbOptions::default().with_scan_batch_size(page),
    )
    .unwrap()
}

fn ids(people: &[Person]) -> Vec<i64> {
    people.iter().map(|p| p.id).collect()
}

// =============================================================================
// Concrete scenarios
// =============================================================================

#[test]
fn test_six_people_limit_and_delete() {
    let db = memory_db(2);
    for id in 1..=6 {
        db.put(&person(id, 32)).unwrap();
    }

    let first_three = db.find(Query::new().limit(3)).unwrap();
    assert_eq!(ids(&first_three), vec![1, 2, 3]);

    db.del(1).unwrap();
    assert_eq!(db.count().unwrap(), 5);
}

#[test]
fn test_limit_applies_during_filtering() {
    let db = memory_db(2);
    for id in 1..=6 {
        let age = if id >= 5 { 70 } else { 20 };
        db.put(&person(id, age)).unwrap();
    }

    let found = db
        .find(Query::new().filter(|p: &Person| p.age > 60).limit(1))
        .unwrap();
    assert_eq!(ids(&found), vec![5]);

    // Filtering only the first scanned record would have found nothing
    let first = db.find(Query::new().limit(1)).unwrap();
    assert!(first.iter().all(|p| p.age <= 60));
}

#[test]
fn test_filter_keeps_scan_order() {
    let db = memory_db(3);
    for id in [9, 2, 7, 4, 1, 8] {
        db.put(&person(id, id as u32 * 10)).unwrap();
    }

    let even = db
        .find(Query::new().filter(|p: &Person| p.id % 2 == 0))
        .unwrap();
    assert_eq!(ids(&even), vec![2, 4, 8]);
}

#[test]
fn test_limit_larger_than_store() {
    let db = memory_db(4);
    for id in 1..=3 {
        db.put(&person(id, 1)).unwrap();
    }

    let result = db.find_with_stats(Query::new().limit(10)).unwrap();
    assert_eq!(result.len(), 3);
    assert!(!result.limit_reached);
}

#[test]
fn test_sorted_limit_is_not_top_k() {
    let db = memory_db(2);
    for (id, age) in [(1, 50), (2, 10), (3, 90), (4, 5)] {
        db.put(&person(id, age)).unwrap();
    }

    let sorted = db
        .find(
            Query::new()
                .sort(|a: &Person, b: &Person| a.age.cmp(&b.age))
                .limit(2),
        )
        .unwrap();
    // First two in scan order (ids 1 and 2), then sorted; id 4 is the global minimum
    assert_eq!(ids(&sorted), vec![2, 1]);
}

#[test]
fn test_mixed_key_order() {
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tag {
        id: Key,
    }

    impl Storable for Tag {
        fn id(&self) -> Key {
            self.id.clone()
        }
    }

    let db: Db<Tag> = Db::open(StoreLocation::Memory, DbOptions::default()).unwrap();
    for id in [Key::from("b"), Key::Int(10), Key::from("a"), Key::Int(-3)] {
        db.put(&Tag { id }).unwrap();
    }

    let order: Vec<Key> = db.scan_keys().collect::<Result<_, _>>().unwrap();
    assert_eq!(
        order,
        vec![Key::Int(-3), Key::Int(10), Key::from("a"), Key::from("b")]
    );
}

// =============================================================================
// Sub-databases and lifecycle
// =============================================================================

#[test]
fn test_sub_databases_are_isolated() {
    let db = memory_db(2);
    let archived: Db<Person> = db.create_sub("archived").unwrap();

    db.put(&person(1, 30)).unwrap();
    archived.put(&person(1, 99)).unwrap();
    archived.put(&person(2, 99)).unwrap();

    assert_eq!(db.count().unwrap(), 1);
    assert_eq!(archived.count().unwrap(), 2);
    assert_eq!(db.get(1).unwrap().age, 30);
    assert_eq!(archived.get(1).unwrap().age, 99);

    assert!(matches!(
        db.create_sub::<Person>("a!b"),
        Err(DbError::InvalidArgument(_))
    ));
}

#[test]
fn test_close_is_shared_with_sub_databases() {
    let db = memory_db(2);
    let sub: Db<Person> = db.create_sub("s").unwrap();

    db.close().unwrap();
    assert!(db.is_closed());
    assert!(matches!(sub.put(&person(1, 1)), Err(DbError::Closed)));
    assert!(matches!(db.count(), Err(DbError::Closed)));
}

#[test]
fn test_on_disk_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let location = StoreLocation::Path(dir.path().to_path_buf());

    {
        let db: Db<Person> = Db::open(location.clone(), DbOptions::default()).unwrap();
        db.put_many(&[person(1, 10), person(2, 20), person(3, 30)])
            .unwrap();
        db.del(2).unwrap();
        db.close().unwrap();
    }

    let db: Db<Person> = Db::open(location, DbOptions::default()).unwrap();
    assert_eq!(db.engine_name(), "log");
    assert_eq!(ids(&db.find(Query::new()).unwrap()), vec![1, 3]);
    assert!(db.get(2).unwrap_err().is_not_found());
}

#[test]
fn test_corrupt_log_refuses_to_open() {
    let dir = TempDir::new().unwrap();
    let location = StoreLocation::Path(dir.path().to_path_buf());

    {
        let db: Db<Person> = Db::open(location.clone(), DbOptions::default()).unwrap();
        db.put(&person(1, 10)).unwrap();
        db.close().unwrap();
    }

    let log_path = dir.path().join(LOG_FILE_NAME);
    let mut contents = fs::read(&log_path).unwrap();
    let mid = contents.len() / 2;
    contents[mid] ^= 0xFF;
    fs::write(&log_path, contents).unwrap();

    let err = Db::<Person>::open(location, DbOptions::default()).unwrap_err();
    assert_eq!(err.code(), "DEPOT_DATA_CORRUPTION");
}

#[test]
fn test_missing_directory_is_not_created() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let result = Db::<Person>::open(StoreLocation::Path(missing.clone()), DbOptions::default());
    assert!(result.is_err());
    assert!(!missing.exists());
}
