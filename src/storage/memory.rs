//! In-memory engine backing the `:mem:` location

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use super::engine::{BatchOp, Engine, KeyRange, ScanItem};
use super::errors::{StorageError, StorageResult};

/// A `BTreeMap` behind a reader-writer lock. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryEngine {
    /// Creates an empty engine
    pub fn new() -> Self {
        Self::default()
    }
}

/// Collects one page of `map` restricted to `range`, strictly after `after`.
pub(crate) fn scan_map(
    map: &BTreeMap<Vec<u8>, Vec<u8>>,
    range: &KeyRange,
    after: Option<&[u8]>,
    limit: usize,
    with_values: bool,
) -> Vec<ScanItem> {
    let lower = match after {
        Some(key) if key >= range.start.as_slice() => Bound::Excluded(key.to_vec()),
        _ => Bound::Included(range.start.clone()),
    };
    let upper = Bound::Excluded(range.end.clone());

    if let (Bound::Excluded(low), Bound::Excluded(high)) = (&lower, &upper) {
        if low >= high {
            return Vec::new();
        }
    }

    map.range((lower, upper))
        .take(limit)
        .map(|(k, v)| (k.clone(), with_values.then(|| v.clone())))
        .collect()
}

impl Engine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let map = self.map.read().map_err(|_| StorageError::poisoned("memory"))?;
        Ok(map.get(key).cloned())
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        let mut map = self.map.write().map_err(|_| StorageError::poisoned("memory"))?;
        map.insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let mut map = self.map.write().map_err(|_| StorageError::poisoned("memory"))?;
        map.remove(key);
        Ok(())
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> StorageResult<()> {
        // One write guard for the whole batch: readers see all or nothing
        let mut map = self.map.write().map_err(|_| StorageError::poisoned("memory"))?;
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    map.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan(
        &self,
        range: &KeyRange,
        after: Option<&[u8]>,
        limit: usize,
        with_values: bool,
    ) -> StorageResult<Vec<ScanItem>> {
        let map = self.map.read().map_err(|_| StorageError::poisoned("memory"))?;
        Ok(scan_map(&map, range, after, limit, with_values))
    }
}
