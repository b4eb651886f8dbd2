use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::blob::{ListCursor, ListPage, PutRequest, StoredBlob};
use crate::error::{BackendError, BackendResult};
use crate::traits::BlobBackend;

/// Default number of keys returned per listing page (matches S3's default).
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// How an injected fault behaves once a request hits a matching key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultMode {
    /// The request fails with [`BackendError::Service`].
    Fail,
    /// The request never completes.
    Stall,
}

#[derive(Clone, Debug)]
struct InjectedFault {
    prefix: String,
    mode: FaultMode,
}

/// In-memory, `BTreeMap`-based blob backend.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock` and
/// cloned on read (payloads are reference-counted [`bytes::Bytes`], so clones
/// are cheap). Faults can be injected per key prefix to exercise partial
/// failure paths.
pub struct InMemoryBlobBackend {
    blobs: RwLock<BTreeMap<String, StoredBlob>>,
    faults: RwLock<Vec<InjectedFault>>,
    page_size: usize,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl InMemoryBlobBackend {
    /// Create a new empty backend with the default page size.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a new empty backend that lists at most `page_size` keys per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            blobs: RwLock::new(BTreeMap::new()),
            faults: RwLock::new(Vec::new()),
            page_size: page_size.max(1),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the backend holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// All keys currently stored, ascending.
    pub fn keys(&self) -> Vec<String> {
        self.blobs
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Keys starting with `prefix`, ascending, without pagination.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.blobs
            .read()
            .expect("lock poisoned")
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Returns `true` if `key` is stored, bypassing injected faults.
    pub fn contains(&self, key: &str) -> bool {
        self.blobs.read().expect("lock poisoned").contains_key(key)
    }

    /// Total number of successful `put` calls served.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Total number of successful `delete` calls served.
    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Make every get, put and delete on keys starting with `prefix` misbehave.
    pub fn inject_fault(&self, prefix: impl Into<String>, mode: FaultMode) {
        self.faults
            .write()
            .expect("lock poisoned")
            .push(InjectedFault {
                prefix: prefix.into(),
                mode,
            });
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        self.faults.write().expect("lock poisoned").clear();
    }

    /// Remove all blobs.
    pub fn clear(&self) {
        self.blobs.write().expect("lock poisoned").clear();
    }

    async fn check_fault(&self, key: &str) -> BackendResult<()> {
        let mode = {
            let faults = self.faults.read().expect("lock poisoned");
            faults
                .iter()
                .find(|f| key.starts_with(&f.prefix))
                .map(|f| f.mode)
        };
        match mode {
            None => Ok(()),
            Some(FaultMode::Fail) => Err(BackendError::Service {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            }),
            Some(FaultMode::Stall) => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

impl Default for InMemoryBlobBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobBackend for InMemoryBlobBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<StoredBlob>> {
        self.check_fault(key).await?;
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    async fn put(&self, key: &str, request: PutRequest) -> BackendResult<()> {
        self.check_fault(key).await?;
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), request.into());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        self.check_fault(key).await?;
        self.blobs.write().expect("lock poisoned").remove(key);
        self.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: &str,
        cursor: Option<ListCursor>,
    ) -> BackendResult<ListPage> {
        let map = self.blobs.read().expect("lock poisoned");
        let lower = match &cursor {
            Some(ListCursor(after)) => {
                if !after.starts_with(prefix) {
                    return Err(BackendError::InvalidCursor(after.clone()));
                }
                Bound::Excluded(after.as_str())
            }
            None => Bound::Included(prefix),
        };

        let mut matching = map
            .range::<str, _>((lower, Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix));

        let keys: Vec<String> = matching.by_ref().take(self.page_size).cloned().collect();
        let next_cursor = match (matching.next(), keys.last()) {
            (Some(_), Some(last)) => Some(ListCursor(last.clone())),
            _ => None,
        };
        Ok(ListPage { keys, next_cursor })
    }
}

impl std::fmt::Debug for InMemoryBlobBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobBackend")
            .field("blob_count", &self.len())
            .field("page_size", &self.page_size)
            .finish()
    }
}
