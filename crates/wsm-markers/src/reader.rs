//! Restoring marker snapshots into a resource tree.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};
use wsm_codec::DataReader;
use wsm_types::WorkspacePath;

use crate::delta::MarkerDelta;
use crate::error::{MarkerError, MarkerResult};
use crate::format::{self, TypeDictionary, INDEX, PREALLOCATE_LIMIT, QNAME, SNAPSHOT_VERSION};
use crate::marker::MarkerInfo;
use crate::set::MarkerSet;
use crate::traits::{MarkerChangeSink, ResourceTree};

/// One decoded record: a path and the complete marker set stored for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerRecord {
    pub path: WorkspacePath,
    pub markers: MarkerSet,
}

/// Pulls records out of a header-less snapshot body.
///
/// The type dictionary lives as long as the decoder, so records must be read
/// in stream order.
#[derive(Debug)]
pub struct RecordDecoder<R> {
    reader: DataReader<R>,
    types: TypeDictionary,
}

impl<R: BufRead> RecordDecoder<R> {
    pub fn new(input: R) -> Self {
        Self::from_reader(DataReader::new(input))
    }

    pub fn from_reader(reader: DataReader<R>) -> Self {
        Self {
            reader,
            types: TypeDictionary::new(),
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }

    /// Decode the next record.
    ///
    /// Returns `Ok(None)` on a clean end of input at a record boundary. End of
    /// input anywhere inside a record is [`MarkerError::CorruptMetadata`].
    pub fn next_record(&mut self) -> MarkerResult<Option<MarkerRecord>> {
        if self.reader.at_end().map_err(MarkerError::from_read)? {
            return Ok(None);
        }
        let path = self.reader.read_string().map_err(MarkerError::from_read)?;
        let offset = self.reader.offset();
        let count = self.reader.read_i32().map_err(MarkerError::from_read)?;
        let count = format::declared_count(count, offset).map_err(MarkerError::from_read)?;

        let mut markers = MarkerSet::with_capacity(count.min(PREALLOCATE_LIMIT));
        for _ in 0..count {
            markers.add(self.read_marker()?);
        }
        Ok(Some(MarkerRecord {
            path: WorkspacePath::new(&path),
            markers,
        }))
    }

    fn read_marker(&mut self) -> MarkerResult<MarkerInfo> {
        let id = self.reader.read_u64().map_err(MarkerError::from_read)?;
        let offset = self.reader.offset();
        let tag = self.reader.read_u8().map_err(MarkerError::from_read)?;
        let marker_type = match tag {
            QNAME => {
                let name = self.reader.read_string().map_err(MarkerError::from_read)?;
                self.types.push(name.clone());
                name
            }
            INDEX => {
                let index = self.reader.read_i32().map_err(MarkerError::from_read)?;
                match self.types.get(index) {
                    Some(name) => name.to_string(),
                    None => {
                        return Err(MarkerError::corrupt(
                            offset,
                            format!(
                                "type index {index} not defined ({} types seen)",
                                self.types.len()
                            ),
                        ))
                    }
                }
            }
            other => {
                return Err(MarkerError::corrupt(
                    offset,
                    format!("unknown type reference tag {other}"),
                ))
            }
        };
        let attributes =
            format::read_attributes(&mut self.reader).map_err(MarkerError::from_read)?;
        Ok(MarkerInfo::with_attributes(id, marker_type, attributes))
    }
}

/// Outcome of restoring a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReadReport {
    /// Records decoded.
    pub records: usize,
    /// Records whose resource existed and received the marker set.
    pub applied: usize,
    /// Records discarded because the resource no longer exists.
    pub skipped: usize,
    /// Markers installed across all applied records.
    pub markers: usize,
}

/// Restores marker snapshots into a [`ResourceTree`], optionally reporting
/// every installed marker to a [`MarkerChangeSink`].
pub struct MarkerSnapshotReader<'a> {
    tree: &'a mut dyn ResourceTree,
    sink: Option<&'a mut dyn MarkerChangeSink>,
}

impl<'a> MarkerSnapshotReader<'a> {
    pub fn new(tree: &'a mut dyn ResourceTree) -> Self {
        Self { tree, sink: None }
    }

    pub fn with_sink(mut self, sink: &'a mut dyn MarkerChangeSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Read a versioned snapshot: an `i32` header, then the body for that
    /// version.
    pub fn read<R: Read>(&mut self, input: R) -> MarkerResult<ReadReport> {
        let mut reader = DataReader::new(BufReader::new(input));
        let version = reader.read_i32().map_err(MarkerError::from_read)?;
        match version {
            SNAPSHOT_VERSION => self.restore(RecordDecoder::from_reader(reader)),
            other => Err(MarkerError::UnsupportedVersion(other)),
        }
    }

    /// Read a header-less snapshot body.
    pub fn read_records<R: BufRead>(&mut self, input: R) -> MarkerResult<ReadReport> {
        self.restore(RecordDecoder::new(input))
    }

    /// Read a versioned snapshot from a file. A missing file is an error.
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> MarkerResult<ReadReport> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!(file = %path.display(), "reading marker snapshot");
        self.read(file)
    }

    fn restore<R: BufRead>(&mut self, mut decoder: RecordDecoder<R>) -> MarkerResult<ReadReport> {
        let mut report = ReadReport::default();
        while let Some(record) = decoder.next_record()? {
            report.records += 1;
            self.apply(record, &mut report);
        }
        info!(
            records = report.records,
            applied = report.applied,
            skipped = report.skipped,
            markers = report.markers,
            bytes = decoder.offset(),
            "marker snapshot restored"
        );
        Ok(report)
    }

    fn apply(&mut self, record: MarkerRecord, report: &mut ReadReport) {
        let Some(resource) = self.tree.resource(&record.path) else {
            debug!(
                path = %record.path,
                markers = record.markers.len(),
                "resource missing; discarding markers"
            );
            report.skipped += 1;
            return;
        };
        if let Some(sink) = self.sink.as_deref_mut() {
            let deltas: Vec<MarkerDelta> = record
                .markers
                .iter()
                .map(|marker| MarkerDelta::added(resource.clone(), marker.clone()))
                .collect();
            if !deltas.is_empty() {
                sink.changed_markers(&resource, deltas);
            }
        }
        report.applied += 1;
        report.markers += record.markers.len();
        self.tree.set_markers(&resource, record.markers);
    }
}

#[cfg(test)]
mod tests {
    use wsm_codec::{DataWriter, Value, TAG_INTEGER};
    use wsm_types::StatusCode;

    use super::*;
    use crate::delta::ChangeKind;
    use crate::memory::{InMemoryWorkspace, RecordingSink};

    fn stream(build: impl FnOnce(&mut DataWriter<Vec<u8>>)) -> Vec<u8> {
        let mut writer = DataWriter::new(Vec::new());
        build(&mut writer);
        writer.into_inner()
    }

    fn record_header(w: &mut DataWriter<Vec<u8>>, path: &str, count: i32) {
        w.write_string(path).unwrap();
        w.write_i32(count).unwrap();
    }

    fn qname_marker(w: &mut DataWriter<Vec<u8>>, id: u64, name: &str) {
        w.write_u64(id).unwrap();
        w.write_u8(QNAME).unwrap();
        w.write_string(name).unwrap();
        w.write_u16(0).unwrap();
    }

    fn index_marker(w: &mut DataWriter<Vec<u8>>, id: u64, index: i32) {
        w.write_u64(id).unwrap();
        w.write_u8(INDEX).unwrap();
        w.write_i32(index).unwrap();
        w.write_u16(0).unwrap();
    }

    fn workspace() -> InMemoryWorkspace {
        let mut ws = InMemoryWorkspace::new();
        ws.add_file("/proj1/file1.txt");
        ws.add_file("/proj1/folder1/file2.txt");
        ws
    }

    fn markers(ws: &InMemoryWorkspace, path: &str) -> Option<MarkerSet> {
        ws.markers_at(&WorkspacePath::new(path)).cloned()
    }

    #[test]
    fn empty_body_is_a_clean_end() {
        let mut ws = workspace();
        let report = MarkerSnapshotReader::new(&mut ws)
            .read_records(&b""[..])
            .unwrap();
        assert_eq!(report, ReadReport::default());
    }

    #[test]
    fn index_refers_to_earlier_qname() {
        let body = stream(|w| {
            record_header(w, "/proj1/file1.txt", 2);
            qname_marker(w, 1, "org.example.problem");
            qname_marker(w, 2, "org.example.task");
            record_header(w, "/proj1/folder1/file2.txt", 1);
            index_marker(w, 3, 1);
        });
        let mut ws = workspace();
        let report = MarkerSnapshotReader::new(&mut ws)
            .read_records(&body[..])
            .unwrap();
        assert_eq!(report.records, 2);
        assert_eq!(report.markers, 3);

        let set = markers(&ws, "/proj1/folder1/file2.txt").unwrap();
        assert_eq!(set.get(3).unwrap().marker_type, "org.example.task");
        let set = markers(&ws, "/proj1/file1.txt").unwrap();
        assert_eq!(set.get(1).unwrap().marker_type, "org.example.problem");
    }

    #[test]
    fn index_before_definition_is_corrupt() {
        let body = stream(|w| {
            record_header(w, "/proj1/file1.txt", 2);
            qname_marker(w, 1, "a");
            index_marker(w, 2, 1);
        });
        let mut ws = workspace();
        let err = MarkerSnapshotReader::new(&mut ws)
            .read_records(&body[..])
            .unwrap_err();
        assert!(matches!(err, MarkerError::CorruptMetadata { .. }));
        assert_eq!(err.code(), Some(StatusCode::FailedReadMetadata));
    }

    #[test]
    fn unknown_type_tag_is_corrupt() {
        let body = stream(|w| {
            record_header(w, "/proj1/file1.txt", 1);
            w.write_u64(1).unwrap();
            w.write_u8(7).unwrap();
        });
        let mut ws = workspace();
        let err = MarkerSnapshotReader::new(&mut ws)
            .read_records(&body[..])
            .unwrap_err();
        match err {
            MarkerError::CorruptMetadata { offset, reason } => {
                assert_eq!(offset, body.len() as u64 - 1);
                assert!(reason.contains("tag 7"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_value_tag_is_corrupt() {
        let body = stream(|w| {
            record_header(w, "/proj1/file1.txt", 1);
            w.write_u64(1).unwrap();
            w.write_u8(QNAME).unwrap();
            w.write_string("a").unwrap();
            w.write_u16(1).unwrap();
            w.write_string("key").unwrap();
            w.write_u8(9).unwrap();
        });
        let mut ws = workspace();
        let err = MarkerSnapshotReader::new(&mut ws)
            .read_records(&body[..])
            .unwrap_err();
        assert!(matches!(err, MarkerError::CorruptMetadata { .. }));
    }

    #[test]
    fn negative_count_is_corrupt() {
        let body = stream(|w| record_header(w, "/proj1/file1.txt", -4));
        let mut ws = workspace();
        let err = MarkerSnapshotReader::new(&mut ws)
            .read_records(&body[..])
            .unwrap_err();
        assert!(matches!(err, MarkerError::CorruptMetadata { .. }));
    }

    #[test]
    fn truncated_record_is_corrupt() {
        let body = stream(|w| {
            record_header(w, "/proj1/file1.txt", 1);
            w.write_u64(1).unwrap();
            w.write_u8(QNAME).unwrap();
            w.write_string("a").unwrap();
            w.write_u16(1).unwrap();
            w.write_string("severity").unwrap();
            w.write_u8(TAG_INTEGER).unwrap();
            w.write_i32(2).unwrap();
        });
        for cut in 1..body.len() {
            let mut ws = workspace();
            let err = MarkerSnapshotReader::new(&mut ws)
                .read_records(&body[..cut])
                .unwrap_err();
            assert!(
                matches!(err, MarkerError::CorruptMetadata { .. }),
                "cut at {cut}: {err:?}"
            );
        }
        let mut ws = workspace();
        MarkerSnapshotReader::new(&mut ws)
            .read_records(&body[..])
            .unwrap();
        let set = markers(&ws, "/proj1/file1.txt").unwrap();
        assert_eq!(set.get(1).unwrap().attribute("severity"), Some(&Value::Integer(2)));
    }

    #[test]
    fn missing_resource_keeps_stream_consistent() {
        let body = stream(|w| {
            record_header(w, "/deleted/file.txt", 1);
            w.write_u64(1).unwrap();
            w.write_u8(QNAME).unwrap();
            w.write_string("a").unwrap();
            w.write_u16(1).unwrap();
            w.write_string("message").unwrap();
            w.write_value(&Value::from("gone")).unwrap();
            record_header(w, "/proj1/file1.txt", 1);
            index_marker(w, 2, 0);
        });
        let mut ws = workspace();
        let mut sink = RecordingSink::new();
        let report = MarkerSnapshotReader::new(&mut ws)
            .with_sink(&mut sink)
            .read_records(&body[..])
            .unwrap();
        assert_eq!(report.records, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.applied, 1);

        let set = markers(&ws, "/proj1/file1.txt").unwrap();
        assert_eq!(set.get(2).unwrap().marker_type, "a");
        assert_eq!(sink.batches.len(), 1);
        assert!(!ws.exists(&WorkspacePath::new("/deleted/file.txt")));
    }

    #[test]
    fn sink_receives_one_added_delta_per_marker() {
        let body = stream(|w| {
            record_header(w, "/proj1/file1.txt", 2);
            qname_marker(w, 1, "a");
            index_marker(w, 2, 0);
            record_header(w, "/proj1", 0);
        });
        let mut ws = workspace();
        let mut sink = RecordingSink::new();
        MarkerSnapshotReader::new(&mut ws)
            .with_sink(&mut sink)
            .read_records(&body[..])
            .unwrap();

        assert_eq!(sink.batches.len(), 1);
        let (resource, deltas) = &sink.batches[0];
        assert_eq!(resource.path, WorkspacePath::new("/proj1/file1.txt"));
        assert_eq!(deltas.len(), 2);
        assert!(deltas.iter().all(|d| d.kind == ChangeKind::Added));
        let mut ids: Vec<u64> = sink.deltas().map(|d| d.marker.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, [1, 2]);

        // An empty record still replaces the set.
        assert_eq!(markers(&ws, "/proj1"), Some(MarkerSet::new()));
    }

    #[test]
    fn record_replaces_existing_set() {
        let mut ws = workspace();
        let file = ws.resource(&WorkspacePath::new("/proj1/file1.txt")).unwrap();
        ws.set_markers(&file, [MarkerInfo::new(99, "old")].into_iter().collect());

        let body = stream(|w| {
            record_header(w, "/proj1/file1.txt", 1);
            qname_marker(w, 1, "new");
        });
        MarkerSnapshotReader::new(&mut ws)
            .read_records(&body[..])
            .unwrap();
        let set = markers(&ws, "/proj1/file1.txt").unwrap();
        assert_eq!(set.len(), 1);
        assert!(!set.contains(99));
    }

    #[test]
    fn versioned_header_dispatch() {
        let body = stream(|w| {
            w.write_i32(SNAPSHOT_VERSION).unwrap();
            record_header(w, "/proj1/file1.txt", 1);
            qname_marker(w, 1, "a");
        });
        let mut ws = workspace();
        let report = MarkerSnapshotReader::new(&mut ws).read(&body[..]).unwrap();
        assert_eq!(report.applied, 1);

        let body = stream(|w| w.write_i32(3).unwrap());
        let err = MarkerSnapshotReader::new(&mut ws).read(&body[..]).unwrap_err();
        assert!(matches!(err, MarkerError::UnsupportedVersion(3)));
        assert_eq!(err.code(), Some(StatusCode::FailedReadMetadata));
    }

    /// Yields `data`, then fails every later read.
    struct FailingInput {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for FailingInput {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.data.len() {
                return Err(std::io::Error::other("device went away"));
            }
            let n = buf.len().min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn stream_failure_mid_record_is_a_read_error() {
        let body = stream(|w| {
            record_header(w, "/proj1/file1.txt", 2);
            qname_marker(w, 1, "a");
        });
        let input = BufReader::new(FailingInput { data: body, pos: 0 });
        let mut ws = workspace();
        let err = MarkerSnapshotReader::new(&mut ws)
            .read_records(input)
            .unwrap_err();
        assert!(
            matches!(err, MarkerError::Read(wsm_codec::CodecError::Io(_))),
            "unexpected error: {err:?}"
        );
        assert_eq!(err.code(), Some(StatusCode::FailedReadMetadata));
        assert!(markers(&ws, "/proj1/file1.txt").is_none());
    }

    #[test]
    fn read_file_requires_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace();
        let err = MarkerSnapshotReader::new(&mut ws)
            .read_file(dir.path().join("markers.snap"))
            .unwrap_err();
        assert!(matches!(err, MarkerError::Io(_)));
    }

    #[test]
    fn decoder_yields_records_in_order() {
        let body = stream(|w| {
            record_header(w, "/b", 1);
            qname_marker(w, 5, "t");
            record_header(w, "/a", 0);
        });
        let mut decoder = RecordDecoder::new(&body[..]);
        let first = decoder.next_record().unwrap().unwrap();
        assert_eq!(first.path, WorkspacePath::new("/b"));
        let second = decoder.next_record().unwrap().unwrap();
        assert_eq!(second.path, WorkspacePath::new("/a"));
        assert!(second.markers.is_empty());
        assert!(decoder.next_record().unwrap().is_none());
        assert_eq!(decoder.offset(), body.len() as u64);
    }
}
