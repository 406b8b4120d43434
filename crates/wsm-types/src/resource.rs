use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::WorkspacePath;

/// The kind of resource a path resolves to in the surrounding resource model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Root,
    Project,
    Folder,
    File,
}

impl ResourceKind {
    /// The kind implied by a path's position: root, then projects, then
    /// folders. Files cannot be told apart from folders by position alone.
    pub fn container_for(path: &WorkspacePath) -> Self {
        match path.segment_count() {
            0 => ResourceKind::Root,
            1 => ResourceKind::Project,
            _ => ResourceKind::Folder,
        }
    }
}

/// Opaque handle to an existing resource, returned by resource lookups.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub path: WorkspacePath,
    pub kind: ResourceKind,
}

impl ResourceHandle {
    pub fn new(path: WorkspacePath, kind: ResourceKind) -> Self {
        Self { path, kind }
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.path)
    }
}
