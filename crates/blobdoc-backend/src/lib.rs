//! Blob backend capability interface for blobdoc.
//!
//! A blob backend is a remote key-value object store: keys are UTF-8 paths,
//! values are opaque byte payloads with a content type. It offers point
//! reads, writes and deletes plus prefix listing that is paginated through an
//! opaque cursor. Read-after-write consistency is *not* assumed by any caller.
//!
//! # Backends
//!
//! All backends implement the [`BlobBackend`] trait:
//!
//! - [`InMemoryBlobBackend`] -- `BTreeMap`-based backend for tests and embedding,
//!   with prefix-scoped fault injection
//! - [`FsBlobBackend`] -- one file per key in a flat directory, for local use
//!
//! # Contract
//!
//! 1. A missing key on read is `Ok(None)`, never an error.
//! 2. Deleting a missing key succeeds.
//! 3. Listing yields keys in ascending order; a page with a `next_cursor`
//!    means more keys remain.
//! 4. Backends never interpret payloads.

pub mod blob;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use blob::{ListCursor, ListPage, PutRequest, StoredBlob};
pub use error::{BackendError, BackendResult};
pub use fs::FsBlobBackend;
pub use memory::{FaultMode, InMemoryBlobBackend, DEFAULT_PAGE_SIZE};
pub use traits::BlobBackend;
