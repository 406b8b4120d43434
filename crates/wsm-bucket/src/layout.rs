//! Mapping between workspace directories and bucket locations on disk.
//!
//! Each directory segment becomes one hex-encoded directory name, so any
//! segment (including ones with characters the host filesystem rejects or
//! folds) maps to a distinct, portable name that decodes back losslessly:
//!
//! ```text
//! <root>/<index_dir>/                     bucket for /
//! <root>/<index_dir>/70726f6a31/          bucket for /proj1
//! <root>/<index_dir>/70726f6a31/666f6c.../ bucket for /proj1/fol...
//! ```

use std::path::{Path, PathBuf};

use wsm_types::WorkspacePath;

/// The directory whose bucket holds the entry for `path`.
///
/// Entries live in their parent directory's bucket; the root's own entry
/// lives in the root bucket.
pub fn owning_directory(path: &WorkspacePath) -> WorkspacePath {
    path.parent().unwrap_or_else(WorkspacePath::root)
}

/// On-disk location of the bucket for `directory`.
pub(crate) fn directory_location(base: &Path, directory: &WorkspacePath) -> PathBuf {
    let mut location = base.to_path_buf();
    for segment in directory.segments() {
        location.push(hex::encode(segment.as_bytes()));
    }
    location
}

/// Decode a bucket directory name back into a path segment.
pub(crate) fn decode_segment(name: &str) -> Option<String> {
    let bytes = hex::decode(name).ok()?;
    let segment = String::from_utf8(bytes).ok()?;
    if segment.is_empty() || segment.contains('/') {
        return None;
    }
    Some(segment)
}
