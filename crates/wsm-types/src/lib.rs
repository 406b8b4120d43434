//! Foundation types for the workspace metadata store (WSM).
//!
//! This crate provides the path, traversal and status types shared by every
//! other WSM crate.
//!
//! # Key Types
//!
//! - [`WorkspacePath`] -- Immutable, segment-based location in the workspace tree
//! - [`Depth`] -- Traversal scope (self, self plus children, full subtree)
//! - [`ResourceKind`] / [`ResourceHandle`] -- Opaque handle to a resource owned
//!   by the surrounding resource model
//! - [`StatusCode`] -- Fixed diagnostic codes attached to structured errors

pub mod depth;
pub mod error;
pub mod path;
pub mod resource;
pub mod status;

pub use depth::Depth;
pub use error::TypeError;
pub use path::WorkspacePath;
pub use resource::{ResourceHandle, ResourceKind};
pub use status::StatusCode;
