//! Bucket tree configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`BucketTree`](crate::BucketTree).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketTreeConfig {
    /// Maximum number of buckets kept in memory at once.
    ///
    /// Buckets pinned by a running traversal and the current bucket are never
    /// evicted, so the cache may briefly exceed this bound on deep trees.
    pub cache_capacity: usize,
    /// Name of the directory, under the tree root, that holds bucket files.
    pub index_dir_name: String,
}

impl Default for BucketTreeConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 32,
            index_dir_name: ".indexes".to_string(),
        }
    }
}

impl BucketTreeConfig {
    /// Default configuration with a different cache bound (minimum 1).
    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            cache_capacity: capacity.max(1),
            ..Default::default()
        }
    }
}
