//! Equality filters.

use docrepo_document::{Document, ObjectId, Value, ID_FIELD};

/// A conjunction of exact-equality field predicates.
///
/// A document matches when every predicate's field is present and equal
/// to the expected value. The empty filter matches everything.
///
/// # Example
///
/// ```
/// use docrepo_document::doc;
/// use docrepo_driver::Filter;
///
/// let filter = Filter::eq("city", "Oslo").and("active", true);
/// assert!(filter.matches(&doc! { "city" => "Oslo", "active" => true, "age" => 3 }));
/// assert!(!filter.matches(&doc! { "city" => "Oslo" }));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    criteria: Document,
}

impl Filter {
    /// Creates a filter matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a filter on the document identity.
    #[must_use]
    pub fn by_id(id: ObjectId) -> Self {
        Self::eq(ID_FIELD, id)
    }

    /// Creates a filter with a single equality predicate.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Adds an equality predicate.
    ///
    /// A second predicate on the same field replaces the first.
    #[must_use]
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria.insert(field, value);
        self
    }

    /// Returns true if the filter has no predicates.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Returns the identity this filter pins, if it has an `_id` predicate.
    pub fn id(&self) -> Option<ObjectId> {
        self.criteria.id()
    }

    /// Returns the predicates as a document.
    pub fn criteria(&self) -> &Document {
        &self.criteria
    }

    /// Tests a document against every predicate.
    pub fn matches(&self, document: &Document) -> bool {
        self.criteria
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

impl From<Document> for Filter {
    fn from(criteria: Document) -> Self {
        Self { criteria }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrepo_document::doc;
    use proptest::prelude::*;

    #[test]
    fn empty_matches_everything() {
        let filter = Filter::all();
        assert!(filter.is_empty());
        assert!(filter.matches(&Document::new()));
        assert!(filter.matches(&doc! { "a" => 1 }));
    }

    #[test]
    fn by_id_matches_identity_only() {
        let id = ObjectId::new();
        let filter = Filter::by_id(id);
        assert_eq!(filter.id(), Some(id));
        assert!(filter.matches(&doc! { ID_FIELD => id, "a" => 1 }));
        assert!(!filter.matches(&doc! { ID_FIELD => ObjectId::new() }));
        assert!(!filter.matches(&doc! { "a" => 1 }));
    }

    #[test]
    fn conjunction_requires_every_field() {
        let filter = Filter::eq("name", "Frank").and("age", 42);
        assert!(filter.matches(&doc! { "name" => "Frank", "age" => 42 }));
        assert!(!filter.matches(&doc! { "name" => "Frank", "age" => 43 }));
        assert!(!filter.matches(&doc! { "name" => "Frank" }));
    }

    #[test]
    fn equality_is_exact_per_type() {
        let filter = Filter::eq("age", 42);
        assert!(!filter.matches(&doc! { "age" => "42" }));
    }

    #[test]
    fn null_predicate_needs_explicit_null() {
        let filter = Filter::eq("nickname", ());
        assert!(filter.matches(&doc! { "nickname" => () }));
        assert!(!filter.matches(&Document::new()));
    }

    #[test]
    fn from_document() {
        let filter = Filter::from(doc! { "a" => 1, "b" => 2 });
        assert_eq!(filter, Filter::eq("a", 1).and("b", 2));
    }

    proptest! {
        #[test]
        fn document_matches_its_own_fields(
            pairs in prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8)
        ) {
            let document: Document = pairs.iter().map(|(k, v)| (k.clone(), *v)).collect();
            prop_assert!(Filter::from(document.clone()).matches(&document));
        }
    }
}
