use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const SEPARATOR: char = '/';

/// An absolute location in the workspace tree.
///
/// A `WorkspacePath` is an ordered list of non-empty segments. The root is the
/// path with zero segments and renders as `/`. The canonical string form
/// (`/proj/folder/file.txt`) is the storage key used by buckets and snapshots.
///
/// Ordering is segment-wise, so an ancestor always sorts before any of its
/// descendants and siblings sort by segment name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct WorkspacePath {
    segments: Vec<String>,
}

impl WorkspacePath {
    /// The root path (zero segments).
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a path from its string form.
    ///
    /// Leading, trailing and repeated separators are ignored, so `""`, `"/"`
    /// and `"//"` all denote the root.
    pub fn new(path: &str) -> Self {
        Self {
            segments: split(path).collect(),
        }
    }

    /// Build a path from already separated segments, validating each one.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments
            .into_iter()
            .map(|s| {
                let s = s.into();
                validate_segment(&s)?;
                Ok(s)
            })
            .collect::<Result<Vec<_>, TypeError>>()?;
        Ok(Self { segments })
    }

    /// Returns `true` for the zero-segment root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments (the depth below root).
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The segment at `index`, if any.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// All segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment, or `None` for the root.
    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(self.truncate(self.segments.len() - 1))
    }

    /// The first `count` segments of this path.
    pub fn truncate(&self, count: usize) -> Self {
        let count = count.min(self.segments.len());
        Self {
            segments: self.segments[..count].to_vec(),
        }
    }

    /// Append one or more segments given in string form.
    ///
    /// Separators inside `tail` introduce additional segments; empty pieces are
    /// dropped, matching [`WorkspacePath::new`].
    pub fn append(&self, tail: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(split(tail));
        Self { segments }
    }

    /// Returns `true` if `self` is an ancestor of, or equal to, `other`.
    pub fn is_prefix_of(&self, other: &WorkspacePath) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Number of leading segments shared with `other`.
    pub fn matching_first_segments(&self, other: &WorkspacePath) -> usize {
        self.segments
            .iter()
            .zip(other.segments.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Returns `true` if `self` is the direct parent of `other`.
    pub fn is_parent_of(&self, other: &WorkspacePath) -> bool {
        other.segments.len() == self.segments.len() + 1 && self.is_prefix_of(other)
    }
}

fn split(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split(SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn validate_segment(segment: &str) -> Result<(), TypeError> {
    if segment.is_empty() {
        return Err(TypeError::InvalidSegment {
            segment: segment.to_string(),
            reason: "segment must not be empty".into(),
        });
    }
    if segment.contains(SEPARATOR) {
        return Err(TypeError::InvalidSegment {
            segment: segment.to_string(),
            reason: format!("segment must not contain {SEPARATOR:?}"),
        });
    }
    Ok(())
}

impl Default for WorkspacePath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for WorkspacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for WorkspacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkspacePath({self})")
    }
}

impl From<&str> for WorkspacePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for WorkspacePath {
    fn from(path: String) -> Self {
        Self::new(&path)
    }
}

impl From<WorkspacePath> for String {
    fn from(path: WorkspacePath) -> Self {
        path.to_string()
    }
}
