//! Flat-directory blob backend.
//!
//! Every key is stored as one `<encoded>.blob` file holding the raw payload
//! and one `<encoded>.meta` JSON sidecar holding the content type and the
//! encryption flag. File names are the hex encoding of the key, so the
//! directory never nests and `/` inside keys carries no meaning on disk.
//! Listing scans the directory and sorts, which is fine for local use but
//! linear in the number of stored blobs.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::blob::{ListCursor, ListPage, PutRequest, StoredBlob};
use crate::error::{BackendError, BackendResult};
use crate::memory::DEFAULT_PAGE_SIZE;
use crate::traits::BlobBackend;

const BLOB_SUFFIX: &str = ".blob";
const META_SUFFIX: &str = ".meta";
const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Serialize, Deserialize)]
struct BlobMeta {
    content_type: String,
    encrypted: bool,
}

/// Blob backend persisting one file per key under a root directory.
#[derive(Clone, Debug)]
pub struct FsBlobBackend {
    root: PathBuf,
    page_size: usize,
    tmp_seq: Arc<AtomicU64>,
}

impl FsBlobBackend {
    /// Open (creating if needed) a backend rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> BackendResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            page_size: DEFAULT_PAGE_SIZE,
            tmp_seq: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Limit listing pages to `page_size` keys.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The directory blobs are stored in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> BackendResult<PathBuf> {
        if key.is_empty() {
            return Err(BackendError::InvalidKey {
                key: key.to_string(),
                reason: "empty key".to_string(),
            });
        }
        Ok(self.root.join(format!("{}{BLOB_SUFFIX}", encode_key(key))))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{META_SUFFIX}", encode_key(key)))
    }

    /// Write `data` to a temp file unique to this write, then rename it over
    /// `path`.
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> BackendResult<()> {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(format!(".{}-{seq}{TMP_SUFFIX}", std::process::id()));
        let written = match tokio::fs::write(&tmp, data).await {
            Ok(()) => tokio::fs::rename(&tmp, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn scan_keys(root: &Path, prefix: &str) -> BackendResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| BackendError::Io(e.into()))?;
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(encoded) = name.strip_suffix(BLOB_SUFFIX) else {
                continue;
            };
            match decode_key(encoded) {
                Some(key) if key.starts_with(prefix) => keys.push(key),
                Some(_) => {}
                None => warn!(file = name, "skipping undecodable blob file name"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl BlobBackend for FsBlobBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<StoredBlob>> {
        let path = self.blob_path(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta = match tokio::fs::read(self.meta_path(key)).await {
            Ok(raw) => serde_json::from_slice::<BlobMeta>(&raw)
                .map_err(|e| BackendError::Serialization(e.to_string()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BlobMeta {
                content_type: "application/octet-stream".to_string(),
                encrypted: false,
            },
            Err(e) => return Err(e.into()),
        };
        Ok(Some(StoredBlob {
            data: Bytes::from(data),
            content_type: meta.content_type,
            encrypted: meta.encrypted,
        }))
    }

    async fn put(&self, key: &str, request: PutRequest) -> BackendResult<()> {
        let path = self.blob_path(key)?;
        let meta = BlobMeta {
            content_type: request.content_type,
            encrypted: request.encrypt,
        };
        let meta_bytes =
            serde_json::to_vec(&meta).map_err(|e| BackendError::Serialization(e.to_string()))?;

        // Payload first, then its sidecar; both land by rename so a failed
        // write never replaces either file with a partial one.
        self.write_atomic(&path, &request.data).await?;
        self.write_atomic(&self.meta_path(key), &meta_bytes).await?;
        debug!(key, bytes = request.data.len(), "blob written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        let path = self.blob_path(key)?;
        for target in [path, self.meta_path(key)] {
            match tokio::fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: &str,
        cursor: Option<ListCursor>,
    ) -> BackendResult<ListPage> {
        let root = self.root.clone();
        let owned_prefix = prefix.to_string();
        let keys = tokio::task::spawn_blocking(move || Self::scan_keys(&root, &owned_prefix))
            .await
            .map_err(|e| BackendError::Io(std::io::Error::other(e)))??;

        let start = match &cursor {
            Some(ListCursor(after)) => keys.partition_point(|k| k <= after),
            None => 0,
        };
        let end = (start + self.page_size).min(keys.len());
        let page: Vec<String> = keys[start..end].to_vec();
        let next_cursor = if end < keys.len() {
            page.last().cloned().map(ListCursor)
        } else {
            None
        };
        Ok(ListPage {
            keys: page,
            next_cursor,
        })
    }
}

/// Hex-encode a key into a file name stem.
fn encode_key(key: &str) -> String {
    hex::encode(key.as_bytes())
}

fn decode_key(encoded: &str) -> Option<String> {
    let bytes = hex::decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}
