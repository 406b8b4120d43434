//! Visitor types used by bucket and tree traversal.

use wsm_types::WorkspacePath;

/// What a traversal should do after visiting an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisitOutcome {
    /// Keep going.
    Continue,
    /// Skip the descendants of the entry just visited, then continue with
    /// its siblings.
    Prune,
    /// Halt the whole traversal immediately.
    Stop,
}

/// A mutable view of one bucket entry handed to a [`Visitor`].
///
/// Changes made through [`Entry::value_mut`] or [`Entry::delete`] are applied
/// to the owning bucket when the visit returns, and mark it dirty.
#[derive(Debug)]
pub struct Entry<'a, V> {
    path: &'a WorkspacePath,
    value: &'a mut V,
    modified: bool,
    deleted: bool,
}

impl<'a, V> Entry<'a, V> {
    pub(crate) fn new(path: &'a WorkspacePath, value: &'a mut V) -> Self {
        Self {
            path,
            value,
            modified: false,
            deleted: false,
        }
    }

    pub fn path(&self) -> &WorkspacePath {
        self.path
    }

    pub fn value(&self) -> &V {
        &*self.value
    }

    /// Mutable access to the value; the bucket is marked dirty.
    pub fn value_mut(&mut self) -> &mut V {
        self.modified = true;
        &mut *self.value
    }

    /// Remove this entry from its bucket once the visit returns.
    pub fn delete(&mut self) {
        self.deleted = true;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

/// Callback invoked for each entry during a traversal.
pub trait Visitor<V> {
    fn visit(&mut self, entry: &mut Entry<'_, V>) -> VisitOutcome;
}

impl<V, F> Visitor<V> for F
where
    F: FnMut(&mut Entry<'_, V>) -> VisitOutcome,
{
    fn visit(&mut self, entry: &mut Entry<'_, V>) -> VisitOutcome {
        self(entry)
    }
}
