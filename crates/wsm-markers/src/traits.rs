//! Seams to the surrounding resource model.

use wsm_types::{ResourceHandle, WorkspacePath};

use crate::delta::MarkerDelta;
use crate::set::MarkerSet;

/// Resolves paths to resources and holds their marker sets.
pub trait ResourceTree {
    /// The resource at `path`, if it currently exists.
    fn resource(&self, path: &WorkspacePath) -> Option<ResourceHandle>;

    /// The marker set attached to `resource`, if any.
    fn markers(&self, resource: &ResourceHandle) -> Option<&MarkerSet>;

    /// Replace the marker set of `resource` wholesale.
    fn set_markers(&mut self, resource: &ResourceHandle, markers: MarkerSet);
}

/// Receives marker change notifications.
pub trait MarkerChangeSink {
    /// One batch of changes for one resource.
    fn changed_markers(&mut self, resource: &ResourceHandle, deltas: Vec<MarkerDelta>);
}
