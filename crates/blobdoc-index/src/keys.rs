//! Backend key layout for documents, catalog entries and markers.
//!
//! The layout is shared with existing data, so every format here is fixed:
//! change nothing without a migration.

/// Reserved namespace for catalog and marker keys.
pub const DEFAULT_NAMESPACE: &str = "::db::";

/// Builds every backend key used by the store under one reserved namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    /// Create a key space rooted at `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// The reserved namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `<collection>/<id>`
    pub fn document_key(&self, collection: &str, id: &str) -> String {
        format!("{collection}/{id}")
    }

    /// `<collection>/`, the listing prefix for a collection's documents.
    pub fn collection_prefix(&self, collection: &str) -> String {
        format!("{collection}/")
    }

    /// Recover the document id from a key listed under `collection`.
    pub fn document_id<'k>(&self, collection: &str, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(collection)?
            .strip_prefix('/')
            .filter(|id| !id.is_empty())
    }

    /// `<ns>/indexes/<collection>`
    pub fn catalog_key(&self, collection: &str) -> String {
        format!("{}/indexes/{collection}", self.namespace)
    }

    /// `<ns>/indexData/<collection>/<field>/<value>/<id>`
    pub fn marker_key(&self, collection: &str, field: &str, value: &str, id: &str) -> String {
        format!(
            "{}/indexData/{collection}/{field}/{value}/{id}",
            self.namespace
        )
    }

    /// `<ns>/indexData/<collection>/`, every marker of a collection.
    pub fn collection_marker_prefix(&self, collection: &str) -> String {
        format!("{}/indexData/{collection}/", self.namespace)
    }

    /// `<ns>/indexData/<collection>/<field>/`, every marker of one index.
    pub fn field_marker_prefix(&self, collection: &str, field: &str) -> String {
        format!("{}/indexData/{collection}/{field}/", self.namespace)
    }

    /// `<ns>/indexStatus/<collection>/<field>`
    pub fn status_key(&self, collection: &str, field: &str) -> String {
        format!("{}/indexStatus/{collection}/{field}", self.namespace)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn layout_is_bit_exact() {
        let keys = KeySpace::default();
        assert_eq!(keys.document_key("users", "u1"), "users/u1");
        assert_eq!(keys.catalog_key("users"), "::db::/indexes/users");
        assert_eq!(
            keys.marker_key("users", "name", "ada", "u1"),
            "::db::/indexData/users/name/ada/u1"
        );
        assert_eq!(keys.status_key("users", "name"), "::db::/indexStatus/users/name");
    }

    #[test]
    fn custom_namespace() {
        let keys = KeySpace::new("_sys");
        assert_eq!(keys.catalog_key("c"), "_sys/indexes/c");
        assert_eq!(keys.field_marker_prefix("c", "f"), "_sys/indexData/c/f/");
    }

    #[test]
    fn document_id_from_listed_key() {
        let keys = KeySpace::default();
        assert_eq!(keys.document_id("users", "users/u1"), Some("u1"));
        assert_eq!(keys.document_id("users", "users/"), None);
        assert_eq!(keys.document_id("users", "usersx/u1"), None);
        assert_eq!(keys.document_id("users", "orders/u1"), None);
    }

    #[test]
    fn markers_fall_under_their_prefixes() {
        let keys = KeySpace::default();
        let marker = keys.marker_key("users", "name", "ada", "u1");
        assert!(marker.starts_with(&keys.field_marker_prefix("users", "name")));
        assert!(marker.starts_with(&keys.collection_marker_prefix("users")));
        assert!(!marker.starts_with(&keys.collection_prefix("users")));
    }

    proptest! {
        #[test]
        fn markers_of_distinct_ids_are_disjoint(
            value in ".*",
            a in "[a-z0-9]{1,8}",
            b in "[a-z0-9]{1,8}",
        ) {
            prop_assume!(a != b);
            let keys = KeySpace::default();
            prop_assert_ne!(
                keys.marker_key("users", "name", &value, &a),
                keys.marker_key("users", "name", &value, &b)
            );
        }

        #[test]
        fn collections_never_share_marker_prefixes(
            c1 in "[a-z]{1,8}",
            c2 in "[a-z]{1,8}",
            value in "[a-z0-9]{0,8}",
        ) {
            prop_assume!(c1 != c2);
            let keys = KeySpace::default();
            let marker = keys.marker_key(&c1, "f", &value, "id");
            prop_assert!(!marker.starts_with(&keys.collection_marker_prefix(&c2)));
        }
    }
}
