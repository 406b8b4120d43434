//! Directory-partitioned bucket store for workspace metadata.
//!
//! Metadata for a workspace path lives in a small file ("bucket") belonging to
//! the path's parent directory, instead of one monolithic file. Buckets are
//! loaded on first access, cached with a bounded size, and written back only
//! when dirty.
//!
//! # Key Types
//!
//! - [`Bucket`] -- One directory's entries, with lazy load and dirty tracking
//! - [`BucketPayload`] -- Value encoding strategy plugged into a bucket
//! - [`BucketTree`] -- Path-to-bucket index, cache, and depth-bounded traversal
//! - [`Visitor`] / [`VisitOutcome`] / [`Entry`] -- Traversal callbacks
//! - [`PropertiesPayload`] -- String-to-string property maps per path
//!
//! # On-disk layout
//!
//! ```text
//! <root>/.indexes/<payload file>                 entries for / and its children
//! <root>/.indexes/<hex(seg)>/<payload file>      entries for /seg/*
//! ```

pub mod bucket;
pub mod config;
pub mod error;
pub mod layout;
pub mod payload;
pub mod properties;
pub mod tree;
pub mod visitor;

pub use bucket::Bucket;
pub use config::BucketTreeConfig;
pub use error::{BucketError, BucketResult};
pub use layout::owning_directory;
pub use payload::BucketPayload;
pub use properties::{Properties, PropertiesPayload};
pub use tree::BucketTree;
pub use visitor::{Entry, VisitOutcome, Visitor};
