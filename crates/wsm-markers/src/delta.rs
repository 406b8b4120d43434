use serde::{Deserialize, Serialize};
use wsm_types::ResourceHandle;

use crate::marker::MarkerInfo;

/// What happened to a marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// A single marker change, reported to a [`MarkerChangeSink`](crate::MarkerChangeSink).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerDelta {
    pub kind: ChangeKind,
    pub resource: ResourceHandle,
    pub marker: MarkerInfo,
}

impl MarkerDelta {
    pub fn new(kind: ChangeKind, resource: ResourceHandle, marker: MarkerInfo) -> Self {
        Self {
            kind,
            resource,
            marker,
        }
    }

    pub fn added(resource: ResourceHandle, marker: MarkerInfo) -> Self {
        Self::new(ChangeKind::Added, resource, marker)
    }
}
