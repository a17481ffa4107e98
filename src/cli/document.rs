//! Schemaless JSON documents for the command line

use std::convert::TryFrom;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::storage::{Key, Storable};

/// A JSON object with an `id` field holding an integer or a string.
///
/// The id is checked when the document is built or decoded, so
/// [`Storable::id`] never has to guess.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Document {
    id: Key,
    body: Value,
}

impl Document {
    /// The whole document, `id` included
    pub fn as_value(&self) -> &Value {
        &self.body
    }

    /// Consumes the document
    pub fn into_value(self) -> Value {
        self.body
    }
}

impl TryFrom<Value> for Document {
    type Error = String;

    fn try_from(body: Value) -> Result<Self, Self::Error> {
        let fields = body
            .as_object()
            .ok_or_else(|| "document must be a JSON object".to_string())?;

        let id = match fields.get("id") {
            Some(Value::String(s)) => Key::Str(s.clone()),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Key::Int)
                .ok_or_else(|| format!("id {} is not a 64-bit integer", n))?,
            Some(other) => return Err(format!("id must be an integer or a string, got {}", other)),
            None => return Err("document has no id field".to_string()),
        };

        Ok(Self { id, body })
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

impl Storable for Document {
    fn id(&self) -> Key {
        self.id.clone()
    }
}

/// Reads an id given on the command line: integers when the text parses as
/// one, strings otherwise.
pub fn parse_id(text: &str) -> Key {
    match text.parse::<i64>() {
        Ok(n) => Key::Int(n),
        Err(_) => Key::Str(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids() {
        let doc = Document::try_from(json!({"id": 7, "name": "a"})).unwrap();
        assert_eq!(doc.id(), Key::Int(7));

        let doc = Document::try_from(json!({"id": "u-1"})).unwrap();
        assert_eq!(doc.id(), Key::Str("u-1".into()));
    }

    #[test]
    fn test_rejects_bad_ids() {
        assert!(Document::try_from(json!({"name": "a"})).is_err());
        assert!(Document::try_from(json!({"id": 1.5})).is_err());
        assert!(Document::try_from(json!({"id": null})).is_err());
        assert!(Document::try_from(json!([1, 2])).is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let doc: Document = serde_json::from_str(r#"{"id":3,"tags":["x"]}"#).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"id":3,"tags":["x"]}"#);
        assert!(serde_json::from_str::<Document>(r#"{"tags":[]}"#).is_err());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), Key::Int(42));
        assert_eq!(parse_id("-3"), Key::Int(-3));
        assert_eq!(parse_id("abc"), Key::Str("abc".into()));
    }
}
