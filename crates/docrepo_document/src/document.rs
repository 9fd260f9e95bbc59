//! Ordered key-value document.

use crate::error::{DocumentError, DocumentResult};
use crate::oid::ObjectId;
use crate::value::Value;

/// Name of the identity field every stored document carries.
pub const ID_FIELD: &str = "_id";

/// A flat, insertion-ordered map from field names to values.
///
/// Documents are what the store persists: one document per entity
/// instance. Field order is preserved as inserted; equality ignores order.
///
/// # Example
///
/// ```
/// use docrepo_document::{doc, Value};
///
/// let person = doc! { "name" => "Frank", "age" => 42 };
/// assert_eq!(person.get("name"), Some(&Value::from("Frank")));
/// assert_eq!(person.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, returning the previous value if the key existed.
    ///
    /// An existing key keeps its position; a new key is appended.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Looks up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(index).1)
    }

    /// Returns true if the field is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Returns the identity stored under `_id`, if it is an object ID.
    pub fn id(&self) -> Option<ObjectId> {
        self.get(ID_FIELD).and_then(Value::as_object_id)
    }

    /// Reads a required text field.
    pub fn get_str(&self, key: &str) -> DocumentResult<&str> {
        let value = self.require(key)?;
        value
            .as_text()
            .ok_or_else(|| mismatch(key, "text", value))
    }

    /// Reads a required integer field.
    pub fn get_i64(&self, key: &str) -> DocumentResult<i64> {
        let value = self.require(key)?;
        value
            .as_integer()
            .ok_or_else(|| mismatch(key, "integer", value))
    }

    /// Reads a required boolean field.
    pub fn get_bool(&self, key: &str) -> DocumentResult<bool> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| mismatch(key, "bool", value))
    }

    /// Reads a required object ID field.
    pub fn get_object_id(&self, key: &str) -> DocumentResult<ObjectId> {
        let value = self.require(key)?;
        value
            .as_object_id()
            .ok_or_else(|| mismatch(key, "object id", value))
    }

    fn require(&self, key: &str) -> DocumentResult<&Value> {
        self.get(key)
            .ok_or_else(|| DocumentError::missing_field(key))
    }
}

fn mismatch(field: &str, expected: &'static str, found: &Value) -> DocumentError {
    DocumentError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: found.kind(),
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .fields
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl Eq for Document {}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut document = Document::new();
        for (k, v) in iter {
            document.insert(k, v);
        }
        document
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a str, &'a Value);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, Value)>,
        fn(&'a (String, Value)) -> (&'a str, &'a Value),
    >;

    fn into_iter(self) -> Self::IntoIter {
        fn split(entry: &(String, Value)) -> (&str, &Value) {
            (entry.0.as_str(), &entry.1)
        }
        self.fields.iter().map(split)
    }
}

/// Builds a [`Document`] from `key => value` pairs.
///
/// Values go through `Into<Value>`.
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ( $( $key:expr => $value:expr ),+ $(,)? ) => {{
        let mut document = $crate::Document::new();
        $( document.insert($key, $value); )+
        document
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn insert_preserves_order() {
        let d = doc! { "z" => 1, "a" => 2, "m" => 3 };
        let keys: Vec<_> = d.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn insert_existing_key_replaces_in_place() {
        let mut d = doc! { "a" => 1, "b" => 2 };
        let previous = d.insert("a", 10);
        assert_eq!(previous, Some(Value::Integer(1)));
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(d.get_i64("a").unwrap(), 10);
    }

    #[test]
    fn remove_field() {
        let mut d = doc! { "a" => 1, "b" => 2 };
        assert_eq!(d.remove("a"), Some(Value::Integer(1)));
        assert_eq!(d.remove("a"), None);
        assert_eq!(d.len(), 1);
        assert!(!d.contains_key("a"));
    }

    #[test]
    fn equality_ignores_order() {
        let d1 = doc! { "a" => 1, "b" => "x" };
        let d2 = doc! { "b" => "x", "a" => 1 };
        assert_eq!(d1, d2);

        let d3 = doc! { "a" => 1 };
        assert_ne!(d1, d3);
        assert_ne!(d3, d1);
    }

    #[test]
    fn id_reads_object_id_field() {
        let id = ObjectId::new();
        let d = doc! { ID_FIELD => id, "name" => "x" };
        assert_eq!(d.id(), Some(id));

        let d = doc! { ID_FIELD => "not-an-id" };
        assert_eq!(d.id(), None);
    }

    #[test]
    fn typed_getters() {
        let d = doc! { "name" => "Frank", "age" => 42, "active" => true };
        assert_eq!(d.get_str("name").unwrap(), "Frank");
        assert_eq!(d.get_i64("age").unwrap(), 42);
        assert!(d.get_bool("active").unwrap());

        assert_eq!(
            d.get_str("missing"),
            Err(DocumentError::missing_field("missing"))
        );
        assert!(matches!(
            d.get_i64("name"),
            Err(DocumentError::TypeMismatch {
                expected: "integer",
                found: "text",
                ..
            })
        ));
    }

    #[test]
    fn from_iterator_and_back() {
        let d: Document = vec![("a", 1i64), ("b", 2i64)].into_iter().collect();
        assert_eq!(d.len(), 2);

        let pairs: Vec<(String, Value)> = d.into_iter().collect();
        assert_eq!(pairs[0], ("a".to_string(), Value::Integer(1)));
    }

    #[test]
    fn empty_macro() {
        let d = doc! {};
        assert!(d.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn equality_survives_reordering(
                pairs in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..12)
            ) {
                let forward: Document = pairs.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let backward: Document = pairs.iter().rev().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(&forward, &backward);
                prop_assert_eq!(forward.len(), pairs.len());
            }

            #[test]
            fn last_insert_wins(key in "[a-z]{1,8}", first in any::<i64>(), second in any::<i64>()) {
                let mut d = Document::new();
                d.insert(key.clone(), first);
                d.insert(key.clone(), second);
                prop_assert_eq!(d.len(), 1);
                prop_assert_eq!(d.get_i64(&key).unwrap(), second);
            }
        }
    }
}
