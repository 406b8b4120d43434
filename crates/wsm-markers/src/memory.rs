use std::collections::BTreeMap;

use wsm_types::{ResourceHandle, ResourceKind, WorkspacePath};

use crate::delta::MarkerDelta;
use crate::set::MarkerSet;
use crate::traits::{MarkerChangeSink, ResourceTree};

#[derive(Clone, Debug)]
struct ResourceRecord {
    kind: ResourceKind,
    markers: Option<MarkerSet>,
}

/// In-memory resource tree.
///
/// Intended for tests and embedding. The root always exists; adding a
/// resource creates any missing ancestors as containers.
#[derive(Clone, Debug)]
pub struct InMemoryWorkspace {
    resources: BTreeMap<WorkspacePath, ResourceRecord>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(
            WorkspacePath::root(),
            ResourceRecord {
                kind: ResourceKind::Root,
                markers: None,
            },
        );
        Self { resources }
    }

    /// Add a resource of the given kind, plus any missing ancestors.
    pub fn add_resource(&mut self, path: &WorkspacePath, kind: ResourceKind) -> ResourceHandle {
        let mut ancestor = path.parent();
        while let Some(dir) = ancestor {
            ancestor = dir.parent();
            let kind = ResourceKind::container_for(&dir);
            self.resources.entry(dir).or_insert(ResourceRecord {
                kind,
                markers: None,
            });
        }
        let record = self
            .resources
            .entry(path.clone())
            .or_insert(ResourceRecord {
                kind,
                markers: None,
            });
        ResourceHandle::new(path.clone(), record.kind)
    }

    pub fn add_file(&mut self, path: &str) -> ResourceHandle {
        self.add_resource(&WorkspacePath::new(path), ResourceKind::File)
    }

    pub fn add_container(&mut self, path: &str) -> ResourceHandle {
        let path = WorkspacePath::new(path);
        let kind = ResourceKind::container_for(&path);
        self.add_resource(&path, kind)
    }

    /// Remove `path` and everything below it. The root cannot be removed.
    pub fn remove_resource(&mut self, path: &WorkspacePath) -> usize {
        if path.is_root() {
            return 0;
        }
        let before = self.resources.len();
        self.resources.retain(|candidate, _| !path.is_prefix_of(candidate));
        before - self.resources.len()
    }

    pub fn exists(&self, path: &WorkspacePath) -> bool {
        self.resources.contains_key(path)
    }

    /// Number of resources, root included.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// The marker set at `path`, if the resource exists and has one.
    pub fn markers_at(&self, path: &WorkspacePath) -> Option<&MarkerSet> {
        self.resources.get(path)?.markers.as_ref()
    }

    /// Every resource that has a marker set, in path order.
    pub fn marker_sets(&self) -> impl Iterator<Item = (&WorkspacePath, &MarkerSet)> {
        self.resources
            .iter()
            .filter_map(|(path, record)| Some((path, record.markers.as_ref()?)))
    }
}

impl Default for InMemoryWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceTree for InMemoryWorkspace {
    fn resource(&self, path: &WorkspacePath) -> Option<ResourceHandle> {
        let record = self.resources.get(path)?;
        Some(ResourceHandle::new(path.clone(), record.kind))
    }

    fn markers(&self, resource: &ResourceHandle) -> Option<&MarkerSet> {
        self.markers_at(&resource.path)
    }

    fn set_markers(&mut self, resource: &ResourceHandle, markers: MarkerSet) {
        if let Some(record) = self.resources.get_mut(&resource.path) {
            record.markers = Some(markers);
        }
    }
}

/// A [`MarkerChangeSink`] that keeps every batch it receives.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub batches: Vec<(ResourceHandle, Vec<MarkerDelta>)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All deltas across batches, in arrival order.
    pub fn deltas(&self) -> impl Iterator<Item = &MarkerDelta> {
        self.batches.iter().flat_map(|(_, deltas)| deltas)
    }
}

impl MarkerChangeSink for RecordingSink {
    fn changed_markers(&mut self, resource: &ResourceHandle, deltas: Vec<MarkerDelta>) {
        self.batches.push((resource.clone(), deltas));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerInfo;

    #[test]
    fn add_creates_ancestors() {
        let mut ws = InMemoryWorkspace::new();
        let file = ws.add_file("/proj1/folder1/file2.txt");
        assert_eq!(file.kind, ResourceKind::File);
        assert_eq!(ws.len(), 4);
        assert_eq!(
            ws.resource(&WorkspacePath::new("/proj1")).map(|r| r.kind),
            Some(ResourceKind::Project)
        );
        assert_eq!(
            ws.resource(&WorkspacePath::new("/proj1/folder1")).map(|r| r.kind),
            Some(ResourceKind::Folder)
        );
    }

    #[test]
    fn remove_takes_subtree() {
        let mut ws = InMemoryWorkspace::new();
        ws.add_file("/proj1/folder1/file2.txt");
        ws.add_file("/proj10/file.txt");
        assert_eq!(ws.remove_resource(&WorkspacePath::new("/proj1")), 3);
        assert!(ws.exists(&WorkspacePath::new("/proj10/file.txt")));
        assert_eq!(ws.remove_resource(&WorkspacePath::root()), 0);
    }

    #[test]
    fn set_markers_on_missing_resource_is_ignored() {
        let mut ws = InMemoryWorkspace::new();
        let ghost = ResourceHandle::new(WorkspacePath::new("/gone"), ResourceKind::File);
        ws.set_markers(&ghost, [MarkerInfo::new(1, "t")].into_iter().collect());
        assert_eq!(ws.marker_sets().count(), 0);
    }
}
