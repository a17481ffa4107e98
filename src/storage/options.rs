//! Store location and open options

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Marker string selecting the in-memory engine
pub const MEMORY_MARKER: &str = ":mem:";

/// Where a store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Volatile in-memory store
    Memory,
    /// On-disk store in an existing directory
    Path(PathBuf),
}

impl StoreLocation {
    /// Maps `":mem:"` to [`StoreLocation::Memory`], anything else to a path.
    pub fn parse(location: &str) -> Self {
        if location == MEMORY_MARKER {
            StoreLocation::Memory
        } else {
            StoreLocation::Path(PathBuf::from(location))
        }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::Memory => f.write_str(MEMORY_MARKER),
            StoreLocation::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Options applied when a store is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbOptions {
    /// Entries fetched per engine read while scanning (default 256)
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,

    /// fsync after every write to an on-disk store (default true)
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,
}

fn default_scan_batch_size() -> usize {
    256
}

fn default_sync_writes() -> bool {
    true
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            scan_batch_size: default_scan_batch_size(),
            sync_writes: default_sync_writes(),
        }
    }
}

impl DbOptions {
    /// Sets the scan page size
    pub fn with_scan_batch_size(mut self, size: usize) -> Self {
        self.scan_batch_size = size;
        self
    }

    /// Enables or disables fsync per write
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Rejects options no store can run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.scan_batch_size == 0 {
            return Err("scan_batch_size must be at least 1".to_string());
        }
        Ok(())
    }
}
