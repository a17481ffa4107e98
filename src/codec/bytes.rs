//! Serde helper storing byte buffers as standard base64 strings.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Attachment {
//!     id: String,
//!     #[serde(with = "depotdb::codec::bytes")]
//!     data: Vec<u8>,
//! }
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Serialize bytes as a base64 string
pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

/// Deserialize bytes from a base64 string
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}
