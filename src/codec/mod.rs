//! Serialization codec
//!
//! A record is encoded as one compact JSON object
//!
//! ```text
//! {"key":<id>,"value":<record>}
//! ```
//!
//! which never contains a raw newline, so archives delimit frames with `\n`.
//! Stored values use the bare record encoding.
//!
//! Encoding verifies its own output by decoding it again before returning:
//! a record that would not survive the round trip (for example an `f64`
//! NaN, which JSON writes as `null`) is rejected with
//! [`CodecError::NotEncodable`] instead of producing a frame that restore
//! could not read.

mod errors;
pub mod bytes;
pub mod frame;

pub use errors::{CodecError, CodecResult};
pub use frame::{FrameReader, FrameWriter, DEFAULT_MAX_FRAME_LEN};

use serde::{Deserialize, Serialize};

use crate::storage::{Key, Storable};

/// One decoded archive frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Entry<T> {
    /// Key the record was stored under
    pub key: Key,
    /// The record
    pub value: T,
}

#[derive(Serialize)]
struct EntryRef<'a, T> {
    key: &'a Key,
    value: &'a T,
}

/// Encodes a record into one frame payload (without delimiter).
pub fn encode<T: Storable>(record: &T) -> CodecResult<Vec<u8>> {
    let key = record.id();
    let bytes = serde_json::to_vec(&EntryRef {
        key: &key,
        value: record,
    })
    .map_err(|e| CodecError::NotEncodable(e.to_string()))?;

    serde_json::from_slice::<Entry<T>>(&bytes)
        .map_err(|e| CodecError::NotEncodable(format!("does not round-trip: {}", e)))?;

    Ok(bytes)
}

/// Decodes one frame payload.
///
/// Fails if the payload is malformed or if its key is not the decoded
/// record's identity.
pub fn decode<T: Storable>(payload: &[u8]) -> CodecResult<Entry<T>> {
    let entry: Entry<T> = serde_json::from_slice(payload)?;
    let id = entry.value.id();
    if id != entry.key {
        return Err(CodecError::KeyMismatch { key: entry.key, id });
    }
    Ok(entry)
}

/// Encodes a record for storage in the engine.
pub fn encode_value<T: Storable>(record: &T) -> CodecResult<Vec<u8>> {
    let bytes =
        serde_json::to_vec(record).map_err(|e| CodecError::NotEncodable(e.to_string()))?;

    serde_json::from_slice::<T>(&bytes)
        .map_err(|e| CodecError::NotEncodable(format!("does not round-trip: {}", e)))?;

    Ok(bytes)
}

/// Decodes a stored engine value.
pub fn decode_value<T: Storable>(bytes: &[u8]) -> CodecResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}
