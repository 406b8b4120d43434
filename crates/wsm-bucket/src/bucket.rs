//! A single on-disk bucket: the metadata entries governed by one directory.
//!
//! File layout:
//!
//! ```text
//! [1 byte: payload version]
//! [entry]*                     until end of file
//! entry := [path: u16-prefixed UTF-8][value: payload-defined]
//! ```
//!
//! There is no entry count; the reader stops at a clean end of file. End of
//! file inside an entry is corruption.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::debug;
use wsm_codec::{CodecError, CodecResult, DataReader, DataWriter};
use wsm_types::{Depth, WorkspacePath};

use crate::error::{BucketError, BucketResult};
use crate::layout::owning_directory;
use crate::payload::BucketPayload;
use crate::visitor::{Entry, VisitOutcome, Visitor};

/// In-memory view of one directory's bucket file.
///
/// A bucket holds the entry for every path whose parent is its directory (plus
/// the root's own entry, for the root bucket). Mutations mark the bucket dirty;
/// nothing reaches disk until [`Bucket::save`].
pub struct Bucket<P: BucketPayload> {
    directory: WorkspacePath,
    location: PathBuf,
    payload: Arc<P>,
    entries: BTreeMap<WorkspacePath, P::Value>,
    version: Option<u8>,
    loaded: bool,
    dirty: bool,
}

impl<P: BucketPayload> std::fmt::Debug for Bucket<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("directory", &self.directory)
            .field("location", &self.location)
            .field("entries", &self.entries.len())
            .field("version", &self.version)
            .field("loaded", &self.loaded)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl<P: BucketPayload> Bucket<P> {
    /// Create an empty, unloaded bucket. Nothing is read from disk.
    pub fn new(directory: WorkspacePath, location: impl Into<PathBuf>, payload: Arc<P>) -> Self {
        Self {
            directory,
            location: location.into(),
            payload,
            entries: BTreeMap::new(),
            version: None,
            loaded: false,
            dirty: false,
        }
    }

    /// Load the bucket for `directory` from `location`.
    ///
    /// A missing bucket file yields an empty, loaded bucket. A file that exists
    /// but cannot be decoded is a read-metadata error.
    pub fn load(
        directory: WorkspacePath,
        location: impl Into<PathBuf>,
        payload: Arc<P>,
    ) -> BucketResult<Self> {
        let mut bucket = Self::new(directory, location, payload);
        let file_path = bucket.file_path();
        match File::open(&file_path) {
            Ok(file) => bucket.read_entries(BufReader::new(file))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(directory = %bucket.directory, "no bucket file; starting empty");
            }
            Err(e) => {
                return Err(BucketError::ReadMetadata {
                    location: file_path,
                    source: e.into(),
                })
            }
        }
        bucket.loaded = true;
        Ok(bucket)
    }

    fn read_entries<R: BufRead>(&mut self, source: R) -> BucketResult<()> {
        let file_path = self.file_path();
        let read_failed = |source: CodecError| BucketError::ReadMetadata {
            location: file_path.clone(),
            source,
        };

        let mut reader = DataReader::new(source);
        let version = reader.read_u8().map_err(read_failed)?;
        let expected = self.payload.version();
        if version != expected {
            return Err(BucketError::UnsupportedVersion {
                location: file_path,
                expected,
                actual: version,
            });
        }

        let mut entries = BTreeMap::new();
        while !reader.at_end().map_err(read_failed)? {
            let key = reader.read_string().map_err(read_failed)?;
            let value = self.payload.read_value(&mut reader).map_err(read_failed)?;
            let path = WorkspacePath::new(&key);
            if !self.governs(&path) {
                return Err(BucketError::Corrupt {
                    location: file_path,
                    reason: format!("entry {key:?} does not belong to bucket {}", self.directory),
                });
            }
            entries.insert(path, value);
        }

        debug!(
            directory = %self.directory,
            entries = entries.len(),
            bytes = reader.offset(),
            "bucket loaded"
        );
        self.entries = entries;
        self.version = Some(version);
        self.dirty = false;
        Ok(())
    }

    /// Persist the bucket if it is dirty. Returns `true` if anything was written.
    ///
    /// An unmodified bucket performs no I/O. A bucket left without entries
    /// removes its file instead of writing an empty one.
    pub fn save(&mut self) -> BucketResult<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let file_path = self.file_path();
        let result = if self.entries.is_empty() {
            remove_if_present(&file_path).map_err(CodecError::from)
        } else {
            self.write_entries(&file_path)
        };
        result.map_err(|source| BucketError::WriteMetadata {
            location: file_path,
            source,
        })?;

        debug!(directory = %self.directory, entries = self.entries.len(), "bucket saved");
        self.version = Some(self.payload.version());
        self.dirty = false;
        Ok(true)
    }

    fn write_entries(&self, file_path: &Path) -> CodecResult<()> {
        fs::create_dir_all(&self.location)?;
        let mut temp = NamedTempFile::new_in(&self.location)?;
        {
            let mut writer = DataWriter::new(BufWriter::new(temp.as_file_mut()));
            writer.write_u8(self.payload.version())?;
            for (path, value) in &self.entries {
                writer.write_string(&path.to_string())?;
                self.payload.write_value(&mut writer, value)?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(file_path).map_err(|e| CodecError::Io(e.error))?;
        Ok(())
    }

    /// The directory this bucket governs.
    pub fn directory(&self) -> &WorkspacePath {
        &self.directory
    }

    /// The on-disk directory holding the bucket file.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Full path of the bucket file.
    pub fn file_path(&self) -> PathBuf {
        self.location.join(self.payload.index_file_name())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Format version of the file last read or written, if any.
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the entry for `path` belongs in this bucket.
    pub fn governs(&self, path: &WorkspacePath) -> bool {
        owning_directory(path) == self.directory
    }

    /// Paths with an entry, in path order.
    pub fn paths(&self) -> impl Iterator<Item = &WorkspacePath> {
        self.entries.keys()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&WorkspacePath, &P::Value)> {
        self.entries.iter()
    }

    pub fn entry_value(&self, path: &WorkspacePath) -> Option<&P::Value> {
        self.entries.get(path)
    }

    /// Store or delete the value for `path`, returning the previous value.
    ///
    /// `None` removes the entry rather than storing a placeholder. Callers that
    /// keep container values are responsible for passing `None` once the
    /// container becomes empty.
    pub fn set_entry_value(
        &mut self,
        path: &WorkspacePath,
        value: Option<P::Value>,
    ) -> BucketResult<Option<P::Value>> {
        if !self.governs(path) {
            return Err(BucketError::OutOfScope {
                path: path.clone(),
                directory: self.directory.clone(),
            });
        }
        let previous = match value {
            Some(value) => {
                self.dirty = true;
                self.entries.insert(path.clone(), value)
            }
            None => {
                let previous = self.entries.remove(path);
                if previous.is_some() {
                    self.dirty = true;
                }
                previous
            }
        };
        Ok(previous)
    }

    /// Visit the entry for `path`, applying any edit the visitor made.
    ///
    /// Returns `None` if the bucket has no entry for `path`.
    pub fn visit_entry<V>(&mut self, path: &WorkspacePath, visitor: &mut V) -> Option<VisitOutcome>
    where
        V: Visitor<P::Value> + ?Sized,
    {
        let value = self.entries.get_mut(path)?;
        let mut entry = Entry::new(path, value);
        let outcome = visitor.visit(&mut entry);
        let (modified, deleted) = (entry.is_modified(), entry.is_deleted());
        if deleted {
            self.entries.remove(path);
            self.dirty = true;
        } else if modified {
            self.dirty = true;
        }
        Some(outcome)
    }

    /// Visit this bucket's entries at or below `filter`, within `depth`.
    ///
    /// Only this bucket is consulted; cross-bucket traversal belongs to
    /// [`BucketTree::accept`](crate::BucketTree::accept). Returns
    /// [`VisitOutcome::Stop`] if the visitor stopped, otherwise `Continue`.
    pub fn accept<V>(
        &mut self,
        filter: &WorkspacePath,
        depth: Depth,
        visitor: &mut V,
    ) -> VisitOutcome
    where
        V: Visitor<P::Value> + ?Sized,
    {
        let base = filter.segment_count();
        let matching: Vec<WorkspacePath> = self
            .entries
            .keys()
            .filter(|path| filter.is_prefix_of(path) && depth.reaches(path.segment_count() - base))
            .cloned()
            .collect();

        let mut pruned: Option<WorkspacePath> = None;
        for path in &matching {
            if pruned.as_ref().is_some_and(|p| p.is_prefix_of(path)) {
                continue;
            }
            match self.visit_entry(path, visitor) {
                Some(VisitOutcome::Stop) => return VisitOutcome::Stop,
                Some(VisitOutcome::Prune) => pruned = Some(path.clone()),
                _ => {}
            }
        }
        VisitOutcome::Continue
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
