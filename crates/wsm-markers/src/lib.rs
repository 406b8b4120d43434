//! Marker persistence for the workspace metadata store (WSM).
//!
//! Markers are small typed annotations (problems, tasks, bookmarks) attached
//! to resources. This crate saves and restores them in two forms:
//!
//! - a whole-workspace **snapshot** stream, written by
//!   [`MarkerSnapshotWriter`] and restored by [`MarkerSnapshotReader`] into a
//!   [`ResourceTree`]
//! - per-directory **buckets** via [`MarkersPayload`] on top of `wsm-bucket`
//!
//! # Key Types
//!
//! - [`MarkerInfo`] -- One marker: id, type name, attribute map
//! - [`MarkerSet`] -- The markers of one resource, keyed by id
//! - [`MarkerSnapshotReader`] / [`RecordDecoder`] -- Snapshot decoding with a
//!   per-pass type dictionary
//! - [`MarkerSnapshotWriter`] -- Snapshot encoding with type interning
//! - [`ResourceTree`] / [`MarkerChangeSink`] -- Seams to the resource model
//! - [`InMemoryWorkspace`] / [`RecordingSink`] -- In-memory implementations
//!   of those seams

pub mod bucket;
pub mod delta;
pub mod error;
pub mod format;
pub mod marker;
pub mod memory;
pub mod reader;
pub mod set;
pub mod traits;
pub mod writer;

pub use bucket::{MarkerBucketExt, MarkerTreeExt, MarkersPayload};
pub use delta::{ChangeKind, MarkerDelta};
pub use error::{MarkerError, MarkerResult};
pub use format::{TypeDictionary, TypeInterner, SNAPSHOT_VERSION};
pub use marker::{MarkerAttributes, MarkerInfo, TRANSIENT};
pub use memory::{InMemoryWorkspace, RecordingSink};
pub use reader::{MarkerRecord, MarkerSnapshotReader, ReadReport, RecordDecoder};
pub use set::MarkerSet;
pub use traits::{MarkerChangeSink, ResourceTree};
pub use writer::MarkerSnapshotWriter;
