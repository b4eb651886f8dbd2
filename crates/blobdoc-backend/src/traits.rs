use async_trait::async_trait;

use crate::blob::{ListCursor, ListPage, PutRequest, StoredBlob};
use crate::error::BackendResult;

/// Remote key-value blob store.
///
/// All implementations must satisfy these invariants:
/// - A read of a missing key returns `Ok(None)`; only transport or service
///   failures are errors.
/// - Deleting a missing key is not an error.
/// - `list_page` yields keys that start with `prefix`, ascending, continuing
///   strictly after the key the cursor was produced for.
/// - Callers must not rely on a read observing a write that has just
///   completed.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Read the blob stored at `key`.
    async fn get(&self, key: &str) -> BackendResult<Option<StoredBlob>>;

    /// Create or replace the blob at `key`.
    async fn put(&self, key: &str, request: PutRequest) -> BackendResult<()>;

    /// Remove the blob at `key`.
    async fn delete(&self, key: &str) -> BackendResult<()>;

    /// List one page of keys starting with `prefix`.
    ///
    /// Pass `None` for the first page and the previous page's `next_cursor`
    /// afterwards.
    async fn list_page(&self, prefix: &str, cursor: Option<ListCursor>)
        -> BackendResult<ListPage>;

    /// Collect every key under `prefix` by walking all pages.
    async fn list_all(&self, prefix: &str) -> BackendResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor = None;
        loop {
            let page = self.list_page(prefix, cursor).await?;
            keys.extend(page.keys);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(keys),
            }
        }
    }

    /// Check whether `key` currently exists.
    async fn exists(&self, key: &str) -> BackendResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
