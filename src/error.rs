//! Error kinds surfaced by the store, the query engine and the pipelines
//!
//! Every public operation fails with exactly one `DbError`; no operation
//! returns a partial result together with success.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::codec::CodecError;
use crate::storage::{Key, StorageError};

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed, store remains usable
    Error,
    /// Store data is corrupt and must not be used further
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Result type used across the crate
pub type DbResult<T> = Result<T, DbError>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum DbError {
    /// Point lookup miss
    #[error("not found: {0}")]
    NotFound(Key),

    /// Malformed archive frame or stored value
    #[error("{}", describe_decode(.frame, .source))]
    Decode {
        /// 1-based archive frame number, `None` for stored values
        frame: Option<u64>,
        /// Underlying codec failure
        #[source]
        source: CodecError,
    },

    /// A record could not be encoded
    #[error("encode error for record {id}: {source}")]
    Encode {
        /// Identity of the offending record
        id: Key,
        /// Underlying codec failure
        #[source]
        source: CodecError,
    },

    /// Underlying engine I/O or corruption
    #[error("engine error: {0}")]
    Engine(#[from] StorageError),

    /// Backup destination failed
    #[error("sink error: {0}")]
    Sink(#[source] io::Error),

    /// Restore source failed
    #[error("source error: {0}")]
    Source(#[source] io::Error),

    /// A non-atomic batch stopped part way
    #[error("batch failed after {applied} of {total} operations: {source}")]
    BatchPartialFailure {
        /// Operations applied before the failure
        applied: usize,
        /// Operations in the batch
        total: usize,
        /// Failure of the first operation that did not apply
        #[source]
        source: StorageError,
    },

    /// The handle was closed
    #[error("database is closed")]
    Closed,

    /// Caller supplied an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A pipeline attempted an illegal state transition
    #[error("invalid state transition: {0}")]
    InvalidState(String),
}

fn describe_decode(frame: &Option<u64>, source: &CodecError) -> String {
    match frame {
        Some(n) => format!("decode error at frame {}: {}", n, source),
        None => format!("decode error: {}", source),
    }
}

impl DbError {
    /// Decode error for a stored value
    pub(crate) fn stored_value(source: CodecError) -> Self {
        DbError::Decode {
            frame: None,
            source,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DbError::NotFound(_) => "DEPOT_NOT_FOUND",
            DbError::Decode { .. } => "DEPOT_DECODE_ERROR",
            DbError::Encode { .. } => "DEPOT_ENCODE_ERROR",
            DbError::Engine(e) => e.code().code(),
            DbError::Sink(_) => "DEPOT_SINK_ERROR",
            DbError::Source(_) => "DEPOT_SOURCE_ERROR",
            DbError::BatchPartialFailure { .. } => "DEPOT_BATCH_PARTIAL_FAILURE",
            DbError::Closed => "DEPOT_CLOSED",
            DbError::InvalidArgument(_) => "DEPOT_INVALID_ARGUMENT",
            DbError::InvalidState(_) => "DEPOT_INVALID_STATE",
        }
    }

    /// Returns the severity of this error
    pub fn severity(&self) -> Severity {
        match self {
            DbError::Engine(e) => e.severity(),
            _ => Severity::Error,
        }
    }

    /// Returns whether this error is a point lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}
