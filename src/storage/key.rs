//! Record identity keys and their engine byte encoding
//!
//! Encoded key layout (after the namespace prefix):
//!
//! ```text
//! Int:  0x01 | (i64 ^ i64::MIN) as u64, big-endian (8 bytes)
//! Str:  0x02 | UTF-8 bytes
//! ```
//!
//! The encoding preserves order: integers sort numerically and before all
//! strings, strings sort bytewise.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag byte for integer keys
pub(crate) const TAG_INT: u8 = 0x01;
/// Tag byte for string keys
pub(crate) const TAG_STR: u8 = 0x02;
/// First byte past the last valid tag; upper bound of a namespace's own keys
pub(crate) const TAG_END: u8 = 0x03;

/// The identity of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// Integer id
    Int(i64),
    /// String id
    Str(String),
}

impl Key {
    /// Appends the order-preserving encoding of this key to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Key::Int(n) => {
                buf.push(TAG_INT);
                buf.extend_from_slice(&((*n as u64) ^ (1u64 << 63)).to_be_bytes());
            }
            Key::Str(s) => {
                buf.push(TAG_STR);
                buf.extend_from_slice(s.as_bytes());
            }
        }
    }

    /// Returns the encoded key.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9);
        self.encode_into(&mut buf);
        buf
    }

    /// Decodes a key previously produced by [`Key::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        let (tag, rest) = bytes
            .split_first()
            .ok_or_else(|| "empty key".to_string())?;

        match *tag {
            TAG_INT => {
                let raw: [u8; 8] = rest
                    .try_into()
                    .map_err(|_| format!("integer key has {} bytes, expected 8", rest.len()))?;
                Ok(Key::Int((u64::from_be_bytes(raw) ^ (1u64 << 63)) as i64))
            }
            TAG_STR => std::str::from_utf8(rest)
                .map(|s| Key::Str(s.to_string()))
                .map_err(|e| format!("string key is not UTF-8: {}", e)),
            other => Err(format!("unknown key tag 0x{:02x}", other)),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{}", n),
            Key::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Int(n as i64)
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Int(n as i64)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Str(s.clone())
    }
}
