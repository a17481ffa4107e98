//! Engine errors
//!
//! | code                         | raised by                          | severity |
//! |------------------------------|------------------------------------|----------|
//! | `DEPOT_STORAGE_IO_ERROR`     | opening a store directory          | error    |
//! | `DEPOT_STORAGE_WRITE_FAILED` | log append, fsync, poisoned lock   | error    |
//! | `DEPOT_STORAGE_READ_FAILED`  | opening the log for replay         | error    |
//! | `DEPOT_DATA_CORRUPTION`      | bad checksum or cut record on open | fatal    |

use std::fmt;
use std::io;

use crate::error::Severity;

/// What went wrong inside an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// The store directory is unusable
    DepotStorageIoError,
    /// A log append or fsync did not complete
    DepotStorageWriteFailed,
    /// The log could not be read back
    DepotStorageReadFailed,
    /// The log does not verify; the store must not be used
    DepotDataCorruption,
}

impl StorageErrorCode {
    /// Stable code string
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::DepotStorageIoError => "DEPOT_STORAGE_IO_ERROR",
            StorageErrorCode::DepotStorageWriteFailed => "DEPOT_STORAGE_WRITE_FAILED",
            StorageErrorCode::DepotStorageReadFailed => "DEPOT_STORAGE_READ_FAILED",
            StorageErrorCode::DepotDataCorruption => "DEPOT_DATA_CORRUPTION",
        }
    }

    /// Corruption is fatal, everything else fails only the operation
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::DepotDataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

/// An engine failure, optionally pinned to a log offset
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    offset: Option<u64>,
    source: Option<io::Error>,
}

impl StorageError {
    fn with_source(code: StorageErrorCode, message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code,
            message: message.into(),
            offset: None,
            source: Some(source),
        }
    }

    /// The store directory could not be used
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_source(StorageErrorCode::DepotStorageIoError, message, source)
    }

    /// An append or fsync failed
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_source(StorageErrorCode::DepotStorageWriteFailed, message, source)
    }

    /// The log could not be opened or inspected for replay
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_source(StorageErrorCode::DepotStorageReadFailed, message, source)
    }

    /// The log record starting at `offset` does not verify
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::DepotDataCorruption,
            message: reason.into(),
            offset: Some(offset),
            source: None,
        }
    }

    /// A writer panicked while holding `what`
    pub(crate) fn poisoned(what: &str) -> Self {
        Self {
            code: StorageErrorCode::DepotStorageWriteFailed,
            message: format!("{} lock poisoned by a panicked writer", what),
            offset: None,
            source: None,
        }
    }

    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Log offset of the failing record, for corruption
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Whether the store must not be used further
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)?;
        if let Some(offset) = self.offset {
            write!(f, " at log offset {}", offset)?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for engine operations
pub type StorageResult<T> = Result<T, StorageError>;
