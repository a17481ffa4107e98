//! The record contract

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::key::Key;

/// A value that can be stored in a [`Db`](super::Db).
///
/// The identity returned by [`Storable::id`] is the record's sole stored key
/// and must not change once the record has been written. Every other field
/// must be deep-encodable through serde: booleans, numbers, strings, byte
/// buffers, timestamps and nested lists, sets and maps of the same.
///
/// Non-finite floats have no encoded form and are rejected on write. Use
/// ordered collections (`BTreeMap`, `BTreeSet`) where byte-identical
/// archives across runs matter.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     id: String,
///     username: String,
/// }
///
/// impl Storable for User {
///     fn id(&self) -> Key {
///         Key::from(&self.id)
///     }
/// }
/// ```
pub trait Storable: Serialize + DeserializeOwned {
    /// The record's identity
    fn id(&self) -> Key;
}
