//! Codec error types

use std::io;

use thiserror::Error;

use crate::storage::Key;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors produced while encoding records or splitting/decoding frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The record cannot be represented without loss
    #[error("record is not encodable: {0}")]
    NotEncodable(String),

    /// The frame payload is not a valid encoded entry
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The input ended inside a frame
    #[error("truncated frame: {0} bytes without a delimiter")]
    Truncated(usize),

    /// A delimiter with nothing before it
    #[error("empty frame")]
    Empty,

    /// Frame larger than the configured maximum
    #[error("frame exceeds the maximum length of {max} bytes")]
    TooLong {
        /// Configured maximum frame length
        max: usize,
    },

    /// The frame's key disagrees with the decoded record's identity
    #[error("frame key {key} does not match record id {id}")]
    KeyMismatch {
        /// Key stored in the frame
        key: Key,
        /// Identity reported by the decoded record
        id: Key,
    },

    /// Reading the underlying byte source failed
    #[error("frame source failed: {0}")]
    Io(#[source] io::Error),
}

impl CodecError {
    /// Returns true for errors caused by the bytes themselves rather than
    /// by the transport carrying them.
    pub fn is_decode(&self) -> bool {
        !matches!(self, CodecError::Io(_) | CodecError::NotEncodable(_))
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError::Malformed(e.to_string())
    }
}
