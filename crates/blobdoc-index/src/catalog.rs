//! The per-collection record of indexed fields.

use std::collections::BTreeSet;
use std::sync::Arc;

use blobdoc_backend::{BlobBackend, PutRequest};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::keys::KeySpace;

/// An immutable set of indexed field names.
///
/// Updates never mutate in place: [`FieldSet::with_field`] returns a new
/// value, so a set handed to a maintenance task cannot change under it.
/// Serializes as `{"fields":[...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    #[serde(default)]
    fields: BTreeSet<String>,
}

impl FieldSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// A new set holding every field of `self` plus `field`.
    pub fn with_field(&self, field: &str) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(field.to_string());
        Self { fields }
    }

    /// Field names in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<String> for FieldSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Progress of a field's backfill, recorded only when status tracking is on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BackfillStatus {
    /// The catalog names the field but its backfill has not completed.
    Building,
    /// The backfill ran to completion.
    Ready {
        documents_scanned: u64,
        markers_written: u64,
    },
}

/// Reads and writes catalog entries and backfill status records.
#[derive(Clone)]
pub struct IndexCatalog {
    backend: Arc<dyn BlobBackend>,
    keys: KeySpace,
    encrypt: bool,
}

impl IndexCatalog {
    pub fn new(backend: Arc<dyn BlobBackend>, keys: KeySpace, encrypt: bool) -> Self {
        Self {
            backend,
            keys,
            encrypt,
        }
    }

    /// Load the indexed fields of `collection`. A missing entry is empty.
    pub async fn get(&self, collection: &str) -> IndexResult<FieldSet> {
        let key = self.keys.catalog_key(collection);
        let Some(blob) = self.backend.get(&key).await? else {
            return Ok(FieldSet::empty());
        };
        serde_json::from_slice(&blob.data).map_err(|e| IndexError::CorruptCatalog {
            collection: collection.to_string(),
            reason: e.to_string(),
        })
    }

    /// Replace the catalog entry of `collection` with `fields`.
    pub async fn put(&self, collection: &str, fields: &FieldSet) -> IndexResult<()> {
        let key = self.keys.catalog_key(collection);
        let body = encode(&key, fields)?;
        self.backend
            .put(
                &key,
                PutRequest::new(body, "application/json").encrypted(self.encrypt),
            )
            .await?;
        debug!(collection, fields = fields.len(), "catalog entry written");
        Ok(())
    }

    /// Load the backfill status of one index, if one was recorded.
    pub async fn status(&self, collection: &str, field: &str) -> IndexResult<Option<BackfillStatus>> {
        let key = self.keys.status_key(collection, field);
        let Some(blob) = self.backend.get(&key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&blob.data)
            .map(Some)
            .map_err(|e| IndexError::CorruptStatus {
                key,
                reason: e.to_string(),
            })
    }

    /// Record the backfill status of one index.
    pub async fn set_status(
        &self,
        collection: &str,
        field: &str,
        status: &BackfillStatus,
    ) -> IndexResult<()> {
        let key = self.keys.status_key(collection, field);
        let body = encode(&key, status)?;
        self.backend
            .put(
                &key,
                PutRequest::new(body, "application/json").encrypted(self.encrypt),
            )
            .await?;
        Ok(())
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> IndexResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| IndexError::Serialization {
        what: key.to_string(),
        reason: e.to_string(),
    })
}

impl std::fmt::Debug for IndexCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCatalog")
            .field("namespace", &self.keys.namespace())
            .finish()
    }
}
