//! Store adapter over an ordered key-value engine
//!
//! `Db<T>` maps typed records to engine entries keyed by the record id.
//! Two engines are bundled:
//!
//! - `MemoryEngine` for `:mem:` stores
//! - `LogEngine`, an append-only checksummed log with an in-memory index
//!
//! Full scans are lazy, paged and never hold an engine lock between pages.

mod db;
mod engine;
mod errors;
mod key;
mod log_engine;
mod memory;
mod options;
mod reader;
mod record;
mod scan;
mod storable;
mod writer;

pub use db::{apply_batch_sequentially, Db};
pub use engine::{BatchOp, Engine, KeyRange, ScanItem};
pub use errors::{StorageError, StorageErrorCode, StorageResult};
pub use key::Key;
pub use log_engine::{LogEngine, LOG_FILE_NAME};
pub use memory::MemoryEngine;
pub use options::{DbOptions, StoreLocation, MEMORY_MARKER};
pub use reader::LogReader;
pub use record::{compute_checksum, LogRecord};
pub use scan::{ScanEntries, ScanKeys, ScanValues};
pub use storable::Storable;
pub use writer::LogWriter;
