//! Writing marker snapshots.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use wsm_codec::DataWriter;
use wsm_types::WorkspacePath;

use crate::error::{MarkerError, MarkerResult};
use crate::format::{self, TypeInterner, INDEX, QNAME, SNAPSHOT_VERSION};
use crate::set::MarkerSet;

/// Encodes marker sets as snapshot records.
///
/// Type names are interned per writer: the first use of a name is written as
/// `QNAME` and later uses as `INDEX`. Every marker and every set is written as
/// given, including empty sets, so a restore replaces each resource's set
/// wholesale. Use [`MarkerSet::without_transient`] to leave out
/// session-only markers.
#[derive(Debug)]
pub struct MarkerSnapshotWriter<W: Write> {
    writer: DataWriter<W>,
    types: TypeInterner,
    records: usize,
}

impl<W: Write> MarkerSnapshotWriter<W> {
    /// Start a versioned snapshot.
    pub fn new(output: W) -> MarkerResult<Self> {
        let mut this = Self::records_only(output);
        this.writer
            .write_i32(SNAPSHOT_VERSION)
            .map_err(MarkerError::Write)?;
        Ok(this)
    }

    /// Start a header-less body, readable with
    /// [`MarkerSnapshotReader::read_records`](crate::MarkerSnapshotReader::read_records).
    pub fn records_only(output: W) -> Self {
        Self {
            writer: DataWriter::new(output),
            types: TypeInterner::new(),
            records: 0,
        }
    }

    /// Records written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Write the record for `path`. Markers are written in id order.
    pub fn write_record(&mut self, path: &WorkspacePath, markers: &MarkerSet) -> MarkerResult<()> {
        let markers = markers.sorted();
        let w = &mut self.writer;
        let count = format::declared_len(markers.len(), w.written()).map_err(MarkerError::Write)?;
        w.write_string(&path.to_string()).map_err(MarkerError::Write)?;
        w.write_i32(count).map_err(MarkerError::Write)?;
        for marker in markers {
            w.write_u64(marker.id).map_err(MarkerError::Write)?;
            match self.types.intern(&marker.marker_type) {
                Some(index) => {
                    w.write_u8(INDEX).map_err(MarkerError::Write)?;
                    w.write_i32(index).map_err(MarkerError::Write)?;
                }
                None => {
                    w.write_u8(QNAME).map_err(MarkerError::Write)?;
                    w.write_string(&marker.marker_type).map_err(MarkerError::Write)?;
                }
            }
            format::write_attributes(w, marker).map_err(MarkerError::Write)?;
        }
        self.records += 1;
        Ok(())
    }

    /// Write every `(path, markers)` pair; returns the number of records written.
    pub fn write_all<'a, I>(&mut self, records: I) -> MarkerResult<usize>
    where
        I: IntoIterator<Item = (&'a WorkspacePath, &'a MarkerSet)>,
    {
        let before = self.records;
        for (path, markers) in records {
            self.write_record(path, markers)?;
        }
        Ok(self.records - before)
    }

    /// Flush and hand back the output.
    pub fn finish(mut self) -> MarkerResult<W> {
        self.writer.flush().map_err(MarkerError::Write)?;
        Ok(self.writer.into_inner())
    }
}

impl MarkerSnapshotWriter<BufWriter<File>> {
    /// Write a versioned snapshot to `path`, replacing any existing file
    /// atomically. Returns the number of records written.
    pub fn write_file<'a, I>(path: impl AsRef<Path>, records: I) -> MarkerResult<usize>
    where
        I: IntoIterator<Item = (&'a WorkspacePath, &'a MarkerSet)>,
    {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        let temp = NamedTempFile::new_in(parent)?;

        let mut writer = MarkerSnapshotWriter::new(BufWriter::new(temp.as_file().try_clone()?))?;
        let written = writer.write_all(records)?;
        drop(writer.finish()?);

        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| MarkerError::Io(e.error))?;
        debug!(file = %path.display(), records = written, "marker snapshot written");
        Ok(written)
    }
}
