//! Serde bridge between Rust records and documents.
//!
//! Records travel through `serde_json::Value` on the way in and out.
//! Object IDs cross the bridge as their 24-character hex string, byte
//! strings as arrays of integers.

use crate::document::Document;
use crate::error::{DocumentError, DocumentResult};
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;

/// Serializes a record into a document.
///
/// The record must serialize to a map. Floats and integers outside the
/// `i64` range are rejected.
pub fn to_document<T: Serialize + ?Sized>(record: &T) -> DocumentResult<Document> {
    let json = serde_json::to_value(record).map_err(|e| DocumentError::serialization(e.to_string()))?;
    match json_to_value(json)? {
        Value::Document(document) => Ok(document),
        other => Err(DocumentError::NotADocument {
            found: other.kind().to_string(),
        }),
    }
}

/// Deserializes a record from a document.
pub fn from_document<T: DeserializeOwned>(document: &Document) -> DocumentResult<T> {
    let json = document_to_json(document);
    serde_json::from_value(json).map_err(|e| DocumentError::deserialization(e.to_string()))
}

fn json_to_value(json: Json) -> DocumentResult<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if n.is_u64() {
                return Err(DocumentError::IntegerOverflow {
                    value: n.to_string(),
                });
            } else {
                return Err(DocumentError::FloatForbidden);
            }
        }
        Json::String(s) => Value::Text(s),
        Json::Array(items) => Value::Array(
            items
                .into_iter()
                .map(json_to_value)
                .collect::<DocumentResult<Vec<_>>>()?,
        ),
        Json::Object(map) => {
            let mut document = Document::new();
            for (key, item) in map {
                document.insert(key, json_to_value(item)?);
            }
            Value::Document(document)
        }
    })
}

fn document_to_json(document: &Document) -> Json {
    Json::Object(
        document
            .iter()
            .map(|(k, v)| (k.to_string(), value_to_json(v)))
            .collect(),
    )
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(n) => Json::from(*n),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Document(d) => document_to_json(d),
        Value::ObjectId(id) => Json::String(id.to_hex()),
    }
}
