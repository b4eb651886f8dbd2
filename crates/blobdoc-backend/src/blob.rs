//! Value types exchanged with a [`BlobBackend`](crate::BlobBackend).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A payload as stored under a backend key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    /// Raw payload bytes.
    pub data: Bytes,
    /// MIME content type recorded at write time.
    pub content_type: String,
    /// Whether server-side encryption was requested for this blob.
    pub encrypted: bool,
}

impl StoredBlob {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` for zero-length payloads (index markers).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A write request: payload plus the metadata the backend records with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutRequest {
    pub data: Bytes,
    pub content_type: String,
    /// Ask the backend to encrypt the object at rest.
    pub encrypt: bool,
}

impl PutRequest {
    /// Create a request for the given payload and content type, unencrypted.
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            encrypt: false,
        }
    }

    /// A zero-length `text/plain` payload.
    pub fn empty() -> Self {
        Self::new(Bytes::new(), "text/plain")
    }

    /// Set the encryption-at-rest flag.
    pub fn encrypted(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }
}

impl From<PutRequest> for StoredBlob {
    fn from(req: PutRequest) -> Self {
        Self {
            data: req.data,
            content_type: req.content_type,
            encrypted: req.encrypt,
        }
    }
}

/// Opaque continuation token for paginated listing.
///
/// Both bundled backends use the last key of the previous page; remote
/// backends are free to carry their own marker strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListCursor(pub String);

/// One page of a prefix listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Keys in this page, ascending.
    pub keys: Vec<String>,
    /// Present iff more pages remain.
    pub next_cursor: Option<ListCursor>,
}

impl ListPage {
    /// Returns `true` if the listing continues past this page.
    pub fn is_truncated(&self) -> bool {
        self.next_cursor.is_some()
    }
}
