//! Secondary field indexes for blobdoc.
//!
//! Indexes are stored in the same blob backend as the documents they cover.
//! Each collection has a catalog entry naming its indexed fields, and each
//! (collection, field, value, document id) membership is a zero-length
//! *marker* key. Nothing here answers queries; this crate only keeps markers
//! in step with document writes.
//!
//! # Key layout
//!
//! ```text
//! <collection>/<id>                                      document
//! <ns>/indexes/<collection>                              catalog entry, {"fields":[...]}
//! <ns>/indexData/<collection>/<field>/<value>/<id>       marker, empty payload
//! <ns>/indexStatus/<collection>/<field>                  backfill status (opt-in)
//! ```
//!
//! `<ns>` is the reserved namespace, `::db::` by default.
//!
//! # Components
//!
//! - [`IndexCatalog`] -- per-collection [`FieldSet`] persisted as JSON
//! - [`IndexMaintainer`] -- reconciles markers for one document transition
//! - [`Backfill`] -- writes markers for a new field across a collection
//! - [`MaintenanceScheduler`] -- bounded, deadline-enforced async maintenance
//! - [`IndexEngine`] -- wires the above together behind one handle
//!
//! # Consistency
//!
//! Markers converge eventually. A reader may briefly see zero or two markers
//! for the same document and field, and concurrent writers of one document
//! may leave the index reflecting an overwritten value until the next write.

pub mod backfill;
pub mod catalog;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod fault;
pub mod keys;
pub mod maintainer;
pub mod names;
pub mod scheduler;
pub mod value;

pub use backfill::{Backfill, BackfillReport};
pub use catalog::{BackfillStatus, FieldSet, IndexCatalog};
pub use config::{IndexConfig, MAX_FAULT_CHANNEL_CAPACITY};
pub use diff::{plan_changes, FieldChange};
pub use engine::{EnsureOutcome, IndexEngine};
pub use error::{IndexError, IndexResult};
pub use fault::{FaultKind, FaultReporter, FaultScope, MaintenanceFault};
pub use keys::{KeySpace, DEFAULT_NAMESPACE};
pub use maintainer::{DocumentUpdate, IndexMaintainer, MaintenanceReport};
pub use names::{validate_collection_name, validate_document_id, validate_field_name};
pub use scheduler::MaintenanceScheduler;
pub use value::{parse_document, FieldValue, ScalarValue};
