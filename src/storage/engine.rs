//! The ordered key-value engine capability
//!
//! An engine stores opaque byte keys and values in bytewise key order.
//! Engines are shared between threads; each method is atomic on its own and
//! the engine serializes conflicting writes.

use std::fmt;

use super::errors::StorageResult;

/// One operation of a write batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite
    Put {
        /// Encoded key
        key: Vec<u8>,
        /// Encoded value
        value: Vec<u8>,
    },
    /// Remove if present
    Delete {
        /// Encoded key
        key: Vec<u8>,
    },
}

impl BatchOp {
    /// The key this operation touches
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

/// Half-open key range `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Inclusive lower bound
    pub start: Vec<u8>,
    /// Exclusive upper bound
    pub end: Vec<u8>,
}

impl KeyRange {
    /// Creates a range
    pub fn new(start: Vec<u8>, end: Vec<u8>) -> Self {
        Self { start, end }
    }

    /// Returns whether `key` lies inside the range
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && key < self.end.as_slice()
    }
}

/// One entry returned by a scan page; `value` is `None` for key-only scans
pub type ScanItem = (Vec<u8>, Option<Vec<u8>>);

/// Ordered key-value engine
pub trait Engine: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &'static str;

    /// Point lookup
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Insert or overwrite one key
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()>;

    /// Remove one key; removing a missing key succeeds
    fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Apply a batch of operations in order.
    ///
    /// Engines reporting [`Engine::supports_atomic_batch`] apply all
    /// operations or none.
    fn write_batch(&self, ops: Vec<BatchOp>) -> StorageResult<()>;

    /// Whether [`Engine::write_batch`] is all-or-nothing
    fn supports_atomic_batch(&self) -> bool {
        true
    }

    /// Reads up to `limit` entries of `range` in key order, starting strictly
    /// after `after` when given.
    fn scan(
        &self,
        range: &KeyRange,
        after: Option<&[u8]>,
        limit: usize,
        with_values: bool,
    ) -> StorageResult<Vec<ScanItem>>;

    /// Makes all acknowledged writes durable
    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl fmt::Debug for dyn Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Engine({})", self.name())
    }
}
