//! Per-directory marker storage on top of [`wsm_bucket`].
//!
//! Entry value layout:
//!
//! ```text
//! [count: i32]
//! [id: u64][type: string][attr count: u16][(key: string, value: TypedValue)]*   × count
//! ```
//!
//! Type names are stored in full; buckets are small enough that interning
//! across entries is not done.

use std::io::{BufRead, Write};

use wsm_bucket::{Bucket, BucketPayload, BucketResult, BucketTree};
use wsm_codec::{CodecResult, DataReader, DataWriter};
use wsm_types::WorkspacePath;

use crate::format::{self, PREALLOCATE_LIMIT};
use crate::marker::MarkerInfo;
use crate::set::MarkerSet;

/// [`BucketPayload`] storing one [`MarkerSet`] per path.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkersPayload;

impl BucketPayload for MarkersPayload {
    type Value = MarkerSet;

    fn version(&self) -> u8 {
        1
    }

    fn index_file_name(&self) -> &str {
        "markers.index"
    }

    fn read_value<R: BufRead>(&self, reader: &mut DataReader<R>) -> CodecResult<MarkerSet> {
        let offset = reader.offset();
        let count = format::declared_count(reader.read_i32()?, offset)?;
        let mut markers = MarkerSet::with_capacity(count.min(PREALLOCATE_LIMIT));
        for _ in 0..count {
            let id = reader.read_u64()?;
            let marker_type = reader.read_string()?;
            let attributes = format::read_attributes(reader)?;
            markers.add(MarkerInfo::with_attributes(id, marker_type, attributes));
        }
        Ok(markers)
    }

    fn write_value<W: Write>(
        &self,
        writer: &mut DataWriter<W>,
        value: &MarkerSet,
    ) -> CodecResult<()> {
        let markers = value.sorted();
        writer.write_i32(format::declared_len(markers.len(), writer.written())?)?;
        for marker in markers {
            writer.write_u64(marker.id)?;
            writer.write_string(&marker.marker_type)?;
            format::write_attributes(writer, marker)?;
        }
        Ok(())
    }
}

/// Marker helpers for a single markers bucket.
pub trait MarkerBucketExt {
    fn markers(&self, path: &WorkspacePath) -> Option<&MarkerSet>;

    /// Replace the set for `path`; an empty set removes the entry.
    fn set_markers(&mut self, path: &WorkspacePath, markers: MarkerSet) -> BucketResult<()>;

    /// Add or replace one marker of `path`.
    fn add_marker(&mut self, path: &WorkspacePath, marker: MarkerInfo) -> BucketResult<()>;

    /// Remove one marker; removing the last one removes the entry.
    fn remove_marker(&mut self, path: &WorkspacePath, id: u64) -> BucketResult<Option<MarkerInfo>>;
}

impl MarkerBucketExt for Bucket<MarkersPayload> {
    fn markers(&self, path: &WorkspacePath) -> Option<&MarkerSet> {
        self.entry_value(path)
    }

    fn set_markers(&mut self, path: &WorkspacePath, markers: MarkerSet) -> BucketResult<()> {
        let markers = (!markers.is_empty()).then_some(markers);
        self.set_entry_value(path, markers)?;
        Ok(())
    }

    fn add_marker(&mut self, path: &WorkspacePath, marker: MarkerInfo) -> BucketResult<()> {
        let mut markers = self.entry_value(path).cloned().unwrap_or_default();
        markers.add(marker);
        self.set_entry_value(path, Some(markers))?;
        Ok(())
    }

    fn remove_marker(&mut self, path: &WorkspacePath, id: u64) -> BucketResult<Option<MarkerInfo>> {
        let Some(mut markers) = self.entry_value(path).cloned() else {
            return Ok(None);
        };
        let removed = markers.remove(id);
        if removed.is_some() {
            self.set_markers(path, markers)?;
        }
        Ok(removed)
    }
}

/// Marker helpers that load the governing bucket first.
pub trait MarkerTreeExt {
    fn markers(&mut self, path: &WorkspacePath) -> BucketResult<Option<MarkerSet>>;

    fn set_markers(&mut self, path: &WorkspacePath, markers: MarkerSet) -> BucketResult<()>;
}

impl MarkerTreeExt for BucketTree<MarkersPayload> {
    fn markers(&mut self, path: &WorkspacePath) -> BucketResult<Option<MarkerSet>> {
        Ok(MarkerBucketExt::markers(self.load_bucket_for(path)?, path).cloned())
    }

    fn set_markers(&mut self, path: &WorkspacePath, markers: MarkerSet) -> BucketResult<()> {
        MarkerBucketExt::set_markers(self.load_bucket_for(path)?, path, markers)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wsm_bucket::{BucketError, VisitOutcome};
    use wsm_codec::Value;
    use wsm_types::Depth;

    use super::*;
    use crate::marker::TRANSIENT;

    fn problem(id: u64, line: i32) -> MarkerInfo {
        MarkerInfo::new(id, "org.example.problem").with_attribute("lineNumber", line)
    }

    #[test]
    fn bucket_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = WorkspacePath::new("/proj1/file1.txt");
        let directory = WorkspacePath::new("/proj1");
        {
            let mut bucket =
                Bucket::load(directory.clone(), dir.path(), Arc::new(MarkersPayload)).unwrap();
            bucket.add_marker(&file, problem(1, 10)).unwrap();
            bucket.add_marker(&file, problem(2, 20)).unwrap();
            bucket
                .add_marker(&file, MarkerInfo::new(3, "t").with_attribute(TRANSIENT, true))
                .unwrap();
            assert!(bucket.save().unwrap());
        }

        let bucket = Bucket::load(directory, dir.path(), Arc::new(MarkersPayload)).unwrap();
        let markers = bucket.markers(&file).unwrap();
        assert_eq!(markers.len(), 3);
        assert_eq!(
            markers.get(2).unwrap().attribute("lineNumber"),
            Some(&Value::Integer(20))
        );
        assert!(markers.get(3).unwrap().is_transient());
    }

    #[test]
    fn reload_matches_memory_and_never_yields_empty_sets() {
        let dir = tempfile::tempdir().unwrap();
        let directory = WorkspacePath::new("/p");
        let transient_only = WorkspacePath::new("/p/f");
        let emptied = WorkspacePath::new("/p/g");
        let cleared = WorkspacePath::new("/p/h");
        let session = MarkerInfo::new(1, "t").with_attribute(TRANSIENT, true);
        let expected: MarkerSet = [session.clone()].into_iter().collect();
        {
            let mut bucket =
                Bucket::load(directory.clone(), dir.path(), Arc::new(MarkersPayload)).unwrap();
            bucket.add_marker(&transient_only, session).unwrap();
            bucket.add_marker(&emptied, problem(2, 1)).unwrap();
            bucket.remove_marker(&emptied, 2).unwrap();
            bucket.add_marker(&cleared, problem(3, 1)).unwrap();
            bucket.set_markers(&cleared, MarkerSet::new()).unwrap();
            assert_eq!(bucket.len(), 1);
            bucket.save().unwrap();
        }

        let bucket = Bucket::load(directory, dir.path(), Arc::new(MarkersPayload)).unwrap();
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket.markers(&transient_only), Some(&expected));
        assert!(bucket.markers(&emptied).is_none());
        assert!(bucket.markers(&cleared).is_none());
    }

    #[test]
    fn removing_last_marker_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let file = WorkspacePath::new("/proj1/file1.txt");
        let mut bucket = Bucket::load(
            WorkspacePath::new("/proj1"),
            dir.path(),
            Arc::new(MarkersPayload),
        )
        .unwrap();
        bucket.add_marker(&file, problem(1, 1)).unwrap();
        assert_eq!(bucket.remove_marker(&file, 7).unwrap(), None);
        assert_eq!(bucket.remove_marker(&file, 1).unwrap().map(|m| m.id), Some(1));
        assert!(bucket.markers(&file).is_none());
        assert!(bucket.is_empty());
    }

    #[test]
    fn markers_outside_directory_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut bucket = Bucket::load(
            WorkspacePath::new("/proj1"),
            dir.path(),
            Arc::new(MarkersPayload),
        )
        .unwrap();
        let err = bucket
            .add_marker(&WorkspacePath::new("/proj2/file.txt"), problem(1, 1))
            .unwrap_err();
        assert!(matches!(err, BucketError::OutOfScope { .. }));
    }

    #[test]
    fn tree_stores_and_visits_markers() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut tree = BucketTree::new(dir.path(), MarkersPayload);
            for (path, id) in [
                ("/proj1/file1.txt", 1),
                ("/proj1/folder1/file2.txt", 2),
                ("/proj2", 3),
            ] {
                let markers = [problem(id, 1)].into_iter().collect();
                tree.set_markers(&WorkspacePath::new(path), markers).unwrap();
            }
            tree.close().unwrap();
        }

        let mut tree = BucketTree::new(dir.path(), MarkersPayload);
        let stored = tree
            .markers(&WorkspacePath::new("/proj1/folder1/file2.txt"))
            .unwrap()
            .unwrap();
        assert!(stored.contains(2));

        let mut total = 0;
        tree.accept(
            &mut |entry: &mut wsm_bucket::Entry<'_, MarkerSet>| {
                total += entry.value().len();
                VisitOutcome::Continue
            },
            &WorkspacePath::root(),
            Depth::Infinite,
        )
        .unwrap();
        assert_eq!(total, 3);
    }
}
