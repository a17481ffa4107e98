//! Typed store handle over a shared engine
//!
//! A `Db<T>` owns a key namespace inside an engine. The root store uses the
//! empty prefix; sub-databases append `!name!`. A namespace's own records
//! live in `[prefix 0x01, prefix 0x03)`, which never overlaps the `!`
//! (0x21) byte that starts a child namespace.

use std::fmt;
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::engine::{BatchOp, Engine, KeyRange};
use super::key::{Key, TAG_END, TAG_INT};
use super::log_engine::LogEngine;
use super::memory::MemoryEngine;
use super::options::{DbOptions, StoreLocation};
use super::scan::{RawCursor, ScanEntries, ScanKeys, ScanValues};
use super::storable::Storable;
use crate::codec;
use crate::error::{DbError, DbResult};
use crate::executor::{FindResult, Query, QueryExecutor};
use crate::observability::Logger;

const NAMESPACE_SEPARATOR: u8 = b'!';

/// Handle to a store of `T` records.
///
/// Cloning is cheap; clones share the engine and the open/closed state.
pub struct Db<T> {
    engine: Arc<dyn Engine>,
    prefix: Vec<u8>,
    open: Arc<AtomicBool>,
    location: StoreLocation,
    options: DbOptions,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Db<T> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            prefix: self.prefix.clone(),
            open: Arc::clone(&self.open),
            location: self.location.clone(),
            options: self.options.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Db<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("location", &self.location)
            .field("engine", &self.engine.name())
            .field("prefix", &String::from_utf8_lossy(&self.prefix))
            .field("open", &self.is_open())
            .finish()
    }
}

impl<T: Storable> Db<T> {
    /// Opens or creates a store.
    ///
    /// `StoreLocation::Memory` starts empty. `StoreLocation::Path` replays
    /// the log in an existing directory; a missing directory is an engine
    /// error.
    pub fn open(location: StoreLocation, options: DbOptions) -> DbResult<Self> {
        options.validate().map_err(DbError::InvalidArgument)?;

        let engine: Arc<dyn Engine> = match &location {
            StoreLocation::Memory => Arc::new(MemoryEngine::new()),
            StoreLocation::Path(dir) => Arc::new(LogEngine::open(dir, options.sync_writes)?),
        };

        let location_str = location.to_string();
        Logger::info(
            "STORE_OPEN",
            &[("engine", engine.name()), ("location", location_str.as_str())],
        );

        Ok(Self::with_engine(engine, location, options))
    }

    /// Wraps an existing engine as a root store.
    pub fn with_engine(engine: Arc<dyn Engine>, location: StoreLocation, options: DbOptions) -> Self {
        Self {
            engine,
            prefix: Vec::new(),
            open: Arc::new(AtomicBool::new(true)),
            location,
            options,
            _marker: PhantomData,
        }
    }

    /// Creates a sub-database sharing this store's engine.
    ///
    /// Sub-database records are invisible to this store's scans and counts
    /// and vice versa. Names must be non-empty and must not contain `!`.
    pub fn create_sub<U: Storable>(&self, name: &str) -> DbResult<Db<U>> {
        self.ensure_open()?;
        if name.is_empty() || name.as_bytes().contains(&NAMESPACE_SEPARATOR) {
            return Err(DbError::InvalidArgument(format!(
                "sub-database name must be non-empty and free of '!': {:?}",
                name
            )));
        }

        let mut prefix = self.prefix.clone();
        prefix.push(NAMESPACE_SEPARATOR);
        prefix.extend_from_slice(name.as_bytes());
        prefix.push(NAMESPACE_SEPARATOR);

        Ok(Db {
            engine: Arc::clone(&self.engine),
            prefix,
            open: Arc::clone(&self.open),
            location: self.location.clone(),
            options: self.options.clone(),
            _marker: PhantomData,
        })
    }

    /// Fetches the record stored under `id`.
    pub fn get(&self, id: impl Into<Key>) -> DbResult<T> {
        self.ensure_open()?;
        let id = id.into();
        match self.engine.get(&self.record_key(&id))? {
            Some(bytes) => codec::decode_value(&bytes).map_err(DbError::stored_value),
            None => Err(DbError::NotFound(id)),
        }
    }

    /// Inserts or replaces `record` under its id.
    pub fn put(&self, record: &T) -> DbResult<()> {
        self.ensure_open()?;
        let (key, value) = self.encode_record(record)?;
        self.engine.put(key, value)?;
        Ok(())
    }

    /// Writes all records in one batch; all land or none do.
    pub fn put_many(&self, records: &[T]) -> DbResult<()> {
        self.ensure_open()?;
        let ops = records
            .iter()
            .map(|record| {
                self.encode_record(record)
                    .map(|(key, value)| BatchOp::Put { key, value })
            })
            .collect::<DbResult<Vec<_>>>()?;
        self.write_batch(ops)
    }

    /// Removes the record under `id`. Removing a missing record succeeds.
    pub fn del(&self, id: impl Into<Key>) -> DbResult<()> {
        self.ensure_open()?;
        self.engine.delete(&self.record_key(&id.into()))?;
        Ok(())
    }

    /// Removes all `ids` in one batch.
    pub fn del_many<I, K>(&self, ids: I) -> DbResult<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.ensure_open()?;
        let ops = ids
            .into_iter()
            .map(|id| BatchOp::Delete {
                key: self.record_key(&id.into()),
            })
            .collect();
        self.write_batch(ops)
    }

    /// Counts records with a key-only scan. O(n).
    pub fn count(&self) -> DbResult<usize> {
        let mut count = 0;
        for key in self.scan_keys() {
            key?;
            count += 1;
        }
        Ok(count)
    }

    /// Lazy cursor over all records in key order.
    pub fn scan_values(&self) -> ScanValues<T> {
        ScanValues::new(self.cursor(true))
    }

    /// Lazy cursor over all keys in key order.
    pub fn scan_keys(&self) -> ScanKeys {
        ScanKeys::new(self.cursor(false))
    }

    /// Lazy cursor over `(key, record)` pairs in key order.
    pub fn entries(&self) -> ScanEntries<T> {
        ScanEntries::new(self.cursor(true))
    }

    /// Visits records in key order until `f` breaks or the scan ends.
    pub fn for_each<F>(&self, mut f: F) -> DbResult<()>
    where
        F: FnMut(T) -> ControlFlow<()>,
    {
        for record in self.scan_values() {
            if f(record?).is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Runs a filter/sort/limit query.
    pub fn find(&self, query: Query<'_, T>) -> DbResult<Vec<T>> {
        QueryExecutor::new(self).find(query)
    }

    /// Runs a query and reports how much of the store was scanned.
    pub fn find_with_stats(&self, query: Query<'_, T>) -> DbResult<FindResult<T>> {
        QueryExecutor::new(self).find_with_stats(query)
    }

    /// First record in key order matching `filter`.
    pub fn first<F>(&self, filter: F) -> DbResult<Option<T>>
    where
        F: Fn(&T) -> bool,
    {
        let mut found = self.find(Query::new().filter(filter).limit(1))?;
        Ok(found.pop())
    }

    fn encode_record(&self, record: &T) -> DbResult<(Vec<u8>, Vec<u8>)> {
        let id = record.id();
        let value = codec::encode_value(record).map_err(|source| DbError::Encode {
            id: id.clone(),
            source,
        })?;
        Ok((self.record_key(&id), value))
    }
}

impl<T> Db<T> {
    /// Closes the handle, its clones and its sub-databases.
    ///
    /// Later operations fail with `Closed`. Closing twice is a no-op.
    pub fn close(&self) -> DbResult<()> {
        if self.open.swap(false, Ordering::AcqRel) {
            self.engine.flush()?;
            let location_str = self.location.to_string();
            Logger::info(
                "STORE_CLOSE",
                &[("engine", self.engine.name()), ("location", location_str.as_str())],
            );
        }
        Ok(())
    }

    /// Returns whether the handle accepts operations.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Returns whether the handle was closed.
    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Makes every acknowledged write durable.
    pub fn flush(&self) -> DbResult<()> {
        self.ensure_open()?;
        self.engine.flush()?;
        Ok(())
    }

    /// Returns where the store lives.
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Returns the options the store was opened with.
    pub fn options(&self) -> &DbOptions {
        &self.options
    }

    /// Returns the engine name.
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DbError::Closed)
        }
    }

    fn record_key(&self, id: &Key) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.prefix.len() + 9);
        key.extend_from_slice(&self.prefix);
        id.encode_into(&mut key);
        key
    }

    fn range(&self) -> KeyRange {
        let mut start = self.prefix.clone();
        start.push(TAG_INT);
        let mut end = self.prefix.clone();
        end.push(TAG_END);
        KeyRange::new(start, end)
    }

    fn cursor(&self, with_values: bool) -> RawCursor {
        RawCursor::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.open),
            self.range(),
            self.prefix.len(),
            with_values,
            self.options.scan_batch_size,
        )
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> DbResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        if self.engine.supports_atomic_batch() {
            self.engine.write_batch(ops)?;
            Ok(())
        } else {
            apply_batch_sequentially(self.engine.as_ref(), ops)
        }
    }
}

/// Applies a batch one operation at a time for engines without atomic batches.
///
/// Stops at the first failure; operations before it stay applied and are
/// reported in `BatchPartialFailure`.
pub fn apply_batch_sequentially(engine: &dyn Engine, ops: Vec<BatchOp>) -> DbResult<()> {
    let total = ops.len();
    for (applied, op) in ops.into_iter().enumerate() {
        let result = match op {
            BatchOp::Put { key, value } => engine.put(key, value),
            BatchOp::Delete { key } => engine.delete(&key),
        };
        if let Err(source) = result {
            return Err(DbError::BatchPartialFailure {
                applied,
                total,
                source,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    use super::*;
    use crate::storage::errors::{StorageError, StorageResult};
    use crate::storage::ScanItem;

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

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tag {
        name: String,
    }

    impl Storable for Tag {
        fn id(&self) -> Key {
            Key::Str(self.name.clone())
        }
    }

    fn person(id: i64) -> Person {
        Person {
            id,
            name: format!("person-{}", id),
            age: 32,
        }
    }

    fn mem_db() -> Db<Person> {
        Db::open(StoreLocation::Memory, DbOptions::default().with_scan_batch_size(2)).unwrap()
    }

    #[test]
    fn test_put_get_overwrite() {
        let db = mem_db();
        db.put(&person(1)).unwrap();
        assert_eq!(db.get(1).unwrap(), person(1));

        let mut older = person(1);
        older.age = 33;
        db.put(&older).unwrap();
        assert_eq!(db.get(1).unwrap().age, 33);
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let db = mem_db();
        let err = db.get(42).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.code(), "DEPOT_NOT_FOUND");
    }

    #[test]
    fn test_del_and_del_missing() {
        let db = mem_db();
        db.put_many(&(1..=6).map(person).collect::<Vec<_>>()).unwrap();
        db.del(1).unwrap();
        db.del(1).unwrap();
        assert_eq!(db.count().unwrap(), 5);

        db.del_many([2, 3, 99]).unwrap();
        assert_eq!(db.count().unwrap(), 3);
    }

    #[test]
    fn test_scan_is_in_key_order() {
        let db = mem_db();
        for id in [5, -1, 3, 100, 0] {
            db.put(&person(id)).unwrap();
        }
        let ids: Vec<i64> = db.scan_values().map(|p| p.unwrap().id).collect();
        assert_eq!(ids, vec![-1, 0, 3, 5, 100]);

        let keys: Vec<Key> = db.scan_keys().map(Result::unwrap).collect();
        assert_eq!(keys.first(), Some(&Key::Int(-1)));
    }

    #[test]
    fn test_for_each_stops_early() {
        let db = mem_db();
        db.put_many(&(1..=6).map(person).collect::<Vec<_>>()).unwrap();

        let mut seen = Vec::new();
        db.for_each(|p| {
            seen.push(p.id);
            if p.id == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_sub_databases_are_isolated() {
        let db = mem_db();
        db.put(&person(1)).unwrap();

        let tags: Db<Tag> = db.create_sub("tags").unwrap();
        tags.put(&Tag { name: "a".into() }).unwrap();
        tags.put(&Tag { name: "b".into() }).unwrap();

        let people: Db<Person> = db.create_sub("people").unwrap();
        people.put(&person(7)).unwrap();

        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(tags.count().unwrap(), 2);
        assert_eq!(people.count().unwrap(), 1);
        assert!(db.get(7).unwrap_err().is_not_found());

        let nested: Db<Tag> = tags.create_sub("inner").unwrap();
        nested.put(&Tag { name: "z".into() }).unwrap();
        assert_eq!(tags.count().unwrap(), 2);

        let entries: Vec<(Key, Tag)> = tags.entries().map(Result::unwrap).collect();
        assert_eq!(entries[0].0, Key::Str("a".into()));
    }

    #[test]
    fn test_sub_name_validation() {
        let db = mem_db();
        assert!(matches!(
            db.create_sub::<Tag>("a!b"),
            Err(DbError::InvalidArgument(_))
        ));
        assert!(db.create_sub::<Tag>("").is_err());
    }

    #[test]
    fn test_close_is_shared() {
        let db = mem_db();
        let clone = db.clone();
        let sub: Db<Tag> = db.create_sub("tags").unwrap();

        clone.close().unwrap();
        assert!(db.is_closed());
        assert!(!sub.is_open());
        assert!(matches!(db.put(&person(1)), Err(DbError::Closed)));
        assert!(matches!(sub.count(), Err(DbError::Closed)));
        clone.close().unwrap();
    }

    #[test]
    fn test_open_rejects_bad_options() {
        let err = Db::<Person>::open(
            StoreLocation::Memory,
            DbOptions::default().with_scan_batch_size(0),
        )
        .unwrap_err();
        assert_eq!(err.code(), "DEPOT_INVALID_ARGUMENT");
    }

    #[test]
    fn test_on_disk_store_reopens() {
        let dir = TempDir::new().unwrap();
        let location = StoreLocation::Path(dir.path().to_path_buf());
        {
            let db: Db<Person> = Db::open(location.clone(), DbOptions::default()).unwrap();
            db.put_many(&(1..=3).map(person).collect::<Vec<_>>()).unwrap();
            db.del(2).unwrap();
            db.close().unwrap();
        }

        let db: Db<Person> = Db::open(location, DbOptions::default()).unwrap();
        assert_eq!(db.engine_name(), "log");
        let ids: Vec<i64> = db.scan_values().map(|p| p.unwrap().id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_missing_directory_fails_open() {
        let dir = TempDir::new().unwrap();
        let err = Db::<Person>::open(
            StoreLocation::Path(dir.path().join("missing")),
            DbOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Engine(_)));
    }

    /// Engine whose puts start failing after a fixed number of successes
    struct FlakyEngine {
        inner: MemoryEngine,
        remaining: Mutex<usize>,
    }

    impl Engine for FlakyEngine {
        fn name(&self) -> &'static str {
            "flaky"
        }
        fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }
        fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
            let mut remaining = self.remaining.lock().unwrap();
            if *remaining == 0 {
                return Err(StorageError::write_failed(
                    "put failed",
                    std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                ));
            }
            *remaining -= 1;
            self.inner.put(key, value)
        }
        fn delete(&self, key: &[u8]) -> StorageResult<()> {
            self.inner.delete(key)
        }
        fn write_batch(&self, _ops: Vec<BatchOp>) -> StorageResult<()> {
            unreachable!("non-atomic engines go through the sequential path")
        }
        fn supports_atomic_batch(&self) -> bool {
            false
        }
        fn scan(
            &self,
            range: &KeyRange,
            after: Option<&[u8]>,
            limit: usize,
            with_values: bool,
        ) -> StorageResult<Vec<ScanItem>> {
            self.inner.scan(range, after, limit, with_values)
        }
    }

    #[test]
    fn test_non_atomic_batch_reports_partial_failure() {
        let engine = Arc::new(FlakyEngine {
            inner: MemoryEngine::new(),
            remaining: Mutex::new(2),
        });
        let db: Db<Person> =
            Db::with_engine(engine, StoreLocation::Memory, DbOptions::default());

        let err = db
            .put_many(&(1..=4).map(person).collect::<Vec<_>>())
            .unwrap_err();
        match err {
            DbError::BatchPartialFailure { applied, total, .. } => {
                assert_eq!(applied, 2);
                assert_eq!(total, 4);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(db.count().unwrap(), 2);
    }
}
