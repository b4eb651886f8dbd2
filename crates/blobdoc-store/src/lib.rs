//! Document store over an eventually-consistent blob backend.
//!
//! Documents live at `<collection>/<id>`. Fields declared indexed on a
//! collection get zero-payload marker keys, maintained asynchronously after
//! every write and backfilled synchronously when the index is declared.
//! This is the main entry point for applications embedding blobdoc.

pub mod config;
pub mod error;
pub mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use store::{Document, DocumentStore};

// Re-export key types
pub use blobdoc_backend::{BlobBackend, FsBlobBackend, InMemoryBlobBackend};
pub use blobdoc_index::{
    BackfillReport, EnsureOutcome, FaultKind, FaultScope, FieldSet, IndexConfig, MaintenanceFault,
};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use blobdoc_backend::FaultMode;

    use super::*;

    fn open_with(backend: Arc<InMemoryBlobBackend>) -> DocumentStore {
        DocumentStore::new(backend, StoreConfig::default()).unwrap()
    }

    fn markers(backend: &InMemoryBlobBackend, collection: &str) -> Vec<String> {
        backend.keys_with_prefix(&format!("::db::/indexData/{collection}/"))
    }

    #[tokio::test]
    async fn rename_after_indexing_moves_marker() {
        let backend = Arc::new(InMemoryBlobBackend::new());
        let store = open_with(backend.clone());

        store
            .put("users", "u1", "application/json", r#"{"name":"ada"}"#)
            .await
            .unwrap();
        store.wait_for_maintenance().await;
        store.ensure_indexed("users", "name").await.unwrap();
        assert_eq!(markers(&backend, "users"), vec!["::db::/indexData/users/name/ada/u1"]);

        store
            .put("users", "u1", "application/json", r#"{"name":"grace"}"#)
            .await
            .unwrap();
        store.wait_for_maintenance().await;

        assert!(backend.contains("::db::/indexData/users/name/grace/u1"));
        assert!(!backend.contains("::db::/indexData/users/name/ada/u1"));
    }

    #[tokio::test]
    async fn collections_never_share_markers() {
        let backend = Arc::new(InMemoryBlobBackend::new());
        let store = open_with(backend.clone());
        for collection in ["users", "orders"] {
            store.ensure_indexed(collection, "status").await.unwrap();
            store
                .put(collection, "x1", "application/json", r#"{"status":"open"}"#)
                .await
                .unwrap();
        }
        store.wait_for_maintenance().await;

        store.delete("orders", "x1").await.unwrap();
        store.wait_for_maintenance().await;

        assert_eq!(markers(&backend, "users"), vec!["::db::/indexData/users/status/open/x1"]);
        assert!(markers(&backend, "orders").is_empty());
    }

    #[tokio::test]
    async fn writes_to_one_document_leave_others_alone() {
        let backend = Arc::new(InMemoryBlobBackend::new());
        let store = open_with(backend.clone());
        store.ensure_indexed("users", "team").await.unwrap();
        for id in ["u1", "u2"] {
            store
                .put("users", id, "application/json", r#"{"team":"red"}"#)
                .await
                .unwrap();
        }
        store.wait_for_maintenance().await;

        store
            .put("users", "u1", "application/json", r#"{"team":"blue"}"#)
            .await
            .unwrap();
        store.wait_for_maintenance().await;

        assert_eq!(
            markers(&backend, "users"),
            vec![
                "::db::/indexData/users/team/blue/u1",
                "::db::/indexData/users/team/red/u2",
            ]
        );
    }

    #[tokio::test]
    async fn backfill_covers_every_existing_document() {
        let backend = Arc::new(InMemoryBlobBackend::with_page_size(7));
        let store = open_with(backend.clone());
        for i in 0..40 {
            let body = format!(r#"{{"bucket":{}}}"#, i % 4);
            store
                .put("items", &format!("i{i:03}"), "application/json", body)
                .await
                .unwrap();
        }
        store.wait_for_maintenance().await;

        let outcome = store.ensure_indexed("items", "bucket").await.unwrap();
        let EnsureOutcome::Created(report) = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        assert_eq!(report.documents_scanned, 40);
        assert_eq!(report.pages, 6);

        let all = markers(&backend, "items");
        assert_eq!(all.len(), 40);
        for i in 0..40 {
            let expected = format!("::db::/indexData/items/bucket/{}/i{i:03}", i % 4);
            assert!(all.contains(&expected), "missing {expected}");
        }

        assert_eq!(
            store.ensure_indexed("items", "bucket").await.unwrap(),
            EnsureOutcome::AlreadyIndexed
        );
        assert_eq!(markers(&backend, "items"), all);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn writes_racing_backfill_converge_on_final_values() {
        let backend = Arc::new(InMemoryBlobBackend::with_page_size(3));
        let store = open_with(backend.clone());
        for i in 0..30 {
            store
                .put("items", &format!("i{i:02}"), "application/json", r#"{"v":"old"}"#)
                .await
                .unwrap();
        }
        store.wait_for_maintenance().await;

        let rewrites = async {
            for i in 0..30 {
                store
                    .put("items", &format!("i{i:02}"), "application/json", r#"{"v":"new"}"#)
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        };
        let (outcome, ()) = tokio::join!(store.ensure_indexed("items", "v"), rewrites);
        outcome.unwrap();
        store.wait_for_maintenance().await;

        let expected: Vec<String> = (0..30)
            .map(|i| format!("::db::/indexData/items/v/new/i{i:02}"))
            .collect();
        assert_eq!(markers(&backend, "items"), expected);
    }

    #[tokio::test]
    async fn fields_without_scalar_values_get_no_marker() {
        let backend = Arc::new(InMemoryBlobBackend::new());
        let store = open_with(backend.clone());
        store.ensure_indexed("users", "name").await.unwrap();
        store
            .put("users", "u1", "application/json", r#"{"name":{"first":"ada"}}"#)
            .await
            .unwrap();
        store
            .put("users", "u2", "application/json", r#"{"age":3}"#)
            .await
            .unwrap();
        store.put("users", "u3", "text/plain", "hello").await.unwrap();
        store.wait_for_maintenance().await;
        assert!(markers(&backend, "users").is_empty());
    }

    #[tokio::test]
    async fn delete_retires_markers() {
        let backend = Arc::new(InMemoryBlobBackend::new());
        let store = open_with(backend.clone());
        store.ensure_indexed("users", "name").await.unwrap();
        store
            .put("users", "u1", "application/json", r#"{"name":"ada"}"#)
            .await
            .unwrap();
        store.wait_for_maintenance().await;

        store.delete("users", "u1").await.unwrap();
        store.wait_for_maintenance().await;
        assert!(store.get("users", "u1").await.unwrap().is_none());
        assert!(markers(&backend, "users").is_empty());
    }

    #[tokio::test]
    async fn maintenance_fault_is_isolated_and_reported() {
        let backend = Arc::new(InMemoryBlobBackend::new());
        let store = open_with(backend.clone());
        store.ensure_indexed("users", "name").await.unwrap();
        store.ensure_indexed("users", "team").await.unwrap();
        let mut faults = store.subscribe_faults();
        backend.inject_fault("::db::/indexData/users/team/", FaultMode::Fail);

        store
            .put("users", "u1", "application/json", r#"{"name":"ada","team":"red"}"#)
            .await
            .unwrap();
        store.wait_for_maintenance().await;

        let fault = faults.recv().await.unwrap();
        assert_eq!(fault.scope, FaultScope::Field("team".into()));
        assert_eq!(markers(&backend, "users"), vec!["::db::/indexData/users/name/ada/u1"]);

        // The next write that changes the field converges it once the backend
        // recovers; an identical re-put would be a no-op diff.
        backend.clear_faults();
        store
            .put("users", "u1", "application/json", r#"{"name":"ada","team":"blue"}"#)
            .await
            .unwrap();
        store.wait_for_maintenance().await;
        assert_eq!(
            markers(&backend, "users"),
            vec![
                "::db::/indexData/users/name/ada/u1",
                "::db::/indexData/users/team/blue/u1",
            ]
        );
    }

    #[tokio::test]
    async fn shutdown_drains_pending_maintenance() {
        let backend = Arc::new(InMemoryBlobBackend::new());
        let store = open_with(backend.clone());
        store.ensure_indexed("users", "name").await.unwrap();
        for i in 0..25 {
            store
                .put("users", &format!("u{i}"), "application/json", r#"{"name":"n"}"#)
                .await
                .unwrap();
        }
        store.shutdown().await;
        assert_eq!(markers(&backend, "users").len(), 25);
    }

    #[tokio::test]
    async fn works_over_filesystem_backend() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FsBlobBackend::open(dir.path()).unwrap().with_page_size(2));
        let store = DocumentStore::new(backend.clone(), StoreConfig::default()).unwrap();

        store
            .put("users", "u1", "application/json", r#"{"name":"ada"}"#)
            .await
            .unwrap();
        store
            .put("users", "u2", "application/json", r#"{"name":"grace"}"#)
            .await
            .unwrap();
        store
            .put("users", "u3", "application/json", r#"{"name":"ada"}"#)
            .await
            .unwrap();
        store.ensure_indexed("users", "name").await.unwrap();
        store.wait_for_maintenance().await;

        let keys = backend.list_all("::db::/indexData/users/name/").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "::db::/indexData/users/name/ada/u1",
                "::db::/indexData/users/name/ada/u3",
                "::db::/indexData/users/name/grace/u2",
            ]
        );
    }
}
