//! The bucket tree: maps workspace paths to directory buckets, caches the
//! buckets currently in memory, and walks them with depth control.
//!
//! Resident buckets live in an arena of slots indexed by directory. A slot is
//! pinned while a traversal is iterating its entries, and the current bucket
//! (the one last returned by [`BucketTree::load_bucket_for`]) is never chosen
//! for eviction. Eviction always saves a dirty bucket before dropping it.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use wsm_types::{Depth, WorkspacePath};

use crate::bucket::Bucket;
use crate::config::BucketTreeConfig;
use crate::error::{BucketError, BucketResult};
use crate::layout::{decode_segment, directory_location, owning_directory};
use crate::payload::BucketPayload;
use crate::visitor::{VisitOutcome, Visitor};

struct Slot<P: BucketPayload> {
    bucket: Bucket<P>,
    last_used: u64,
    pins: u32,
}

/// Index and cache over every bucket below one storage root.
pub struct BucketTree<P: BucketPayload> {
    base: PathBuf,
    payload: Arc<P>,
    config: BucketTreeConfig,
    slots: Vec<Option<Slot<P>>>,
    directories: HashMap<WorkspacePath, usize>,
    current: Option<usize>,
    tick: u64,
}

impl<P: BucketPayload> std::fmt::Debug for BucketTree<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketTree")
            .field("base", &self.base)
            .field("resident", &self.directories.len())
            .field("cache_capacity", &self.config.cache_capacity)
            .finish()
    }
}

impl<P: BucketPayload> BucketTree<P> {
    /// Create a tree rooted at `root` with the default configuration.
    pub fn new(root: impl AsRef<Path>, payload: P) -> Self {
        Self::with_config(root, payload, BucketTreeConfig::default())
    }

    /// Create a tree rooted at `root`. Bucket files live under
    /// `root/<config.index_dir_name>`. Nothing is read until first access.
    pub fn with_config(root: impl AsRef<Path>, payload: P, config: BucketTreeConfig) -> Self {
        let base = root.as_ref().join(&config.index_dir_name);
        let config = BucketTreeConfig {
            cache_capacity: config.cache_capacity.max(1),
            ..config
        };
        Self {
            base,
            payload: Arc::new(payload),
            config,
            slots: Vec::new(),
            directories: HashMap::new(),
            current: None,
            tick: 0,
        }
    }

    /// Directory holding every bucket file of this tree.
    pub fn location(&self) -> &Path {
        &self.base
    }

    pub fn config(&self) -> &BucketTreeConfig {
        &self.config
    }

    /// On-disk location of the bucket for `directory`.
    pub fn location_for(&self, directory: &WorkspacePath) -> PathBuf {
        directory_location(&self.base, directory)
    }

    /// Number of buckets currently held in memory.
    pub fn resident_count(&self) -> usize {
        self.directories.len()
    }

    /// Returns `true` if the bucket for `directory` is in memory.
    pub fn is_resident(&self, directory: &WorkspacePath) -> bool {
        self.directories.contains_key(directory)
    }

    /// The resident bucket for `directory`, without loading it.
    pub fn bucket(&self, directory: &WorkspacePath) -> Option<&Bucket<P>> {
        let idx = *self.directories.get(directory)?;
        self.slots[idx].as_ref().map(|slot| &slot.bucket)
    }

    /// The bucket last returned by [`BucketTree::load_bucket_for`].
    pub fn current(&self) -> Option<&Bucket<P>> {
        let idx = self.current?;
        self.slots[idx].as_ref().map(|slot| &slot.bucket)
    }

    pub fn current_mut(&mut self) -> Option<&mut Bucket<P>> {
        let idx = self.current?;
        self.slots[idx].as_mut().map(|slot| &mut slot.bucket)
    }

    /// Load (or fetch from cache) the bucket governing `path` and make it
    /// current.
    ///
    /// Call this before mutating an entry so on-disk state is read first and
    /// never clobbered.
    pub fn load_bucket_for(&mut self, path: &WorkspacePath) -> BucketResult<&mut Bucket<P>> {
        let directory = owning_directory(path);
        let idx = self.resident(&directory)?;
        self.current = Some(idx);
        Ok(&mut self.slot_mut(idx).bucket)
    }

    /// Read the value stored for `path`, loading its bucket if needed.
    pub fn entry_value(&mut self, path: &WorkspacePath) -> BucketResult<Option<P::Value>> {
        Ok(self.load_bucket_for(path)?.entry_value(path).cloned())
    }

    /// Store or delete the value for `path`, loading its bucket if needed.
    pub fn set_entry_value(
        &mut self,
        path: &WorkspacePath,
        value: Option<P::Value>,
    ) -> BucketResult<Option<P::Value>> {
        self.load_bucket_for(path)?.set_entry_value(path, value)
    }

    /// Visit `root` and, depending on `depth`, its children or its whole
    /// subtree.
    ///
    /// Entries are visited parent before children, siblings in path order.
    /// Buckets are loaded as the walk reaches them. Returns
    /// [`VisitOutcome::Stop`] if the visitor halted the walk, otherwise
    /// `Continue`.
    pub fn accept<V>(
        &mut self,
        visitor: &mut V,
        root: &WorkspacePath,
        depth: Depth,
    ) -> BucketResult<VisitOutcome>
    where
        V: Visitor<P::Value> + ?Sized,
    {
        let owner = owning_directory(root);
        let idx = self.resident(&owner)?;
        let outcome = self
            .slot_mut(idx)
            .bucket
            .visit_entry(root, visitor)
            .unwrap_or(VisitOutcome::Continue);
        match outcome {
            VisitOutcome::Stop => return Ok(VisitOutcome::Stop),
            VisitOutcome::Prune => return Ok(VisitOutcome::Continue),
            VisitOutcome::Continue => {}
        }
        if !depth.includes_children() || !self.has_subtree(root) {
            return Ok(VisitOutcome::Continue);
        }
        self.visit_children(visitor, root, depth)
    }

    /// Save every dirty resident bucket. Returns how many were written.
    pub fn save(&mut self) -> BucketResult<usize> {
        let mut saved = 0;
        for slot in self.slots.iter_mut().flatten() {
            if slot.bucket.save()? {
                saved += 1;
            }
        }
        if saved > 0 {
            debug!(saved, "bucket tree saved");
        }
        Ok(saved)
    }

    /// Save and drop the bucket for `directory`. Returns `false` if it was not
    /// resident. If it was the current bucket, there is no current bucket
    /// afterwards.
    pub fn evict(&mut self, directory: &WorkspacePath) -> BucketResult<bool> {
        match self.directories.get(directory) {
            Some(&idx) => {
                self.evict_slot(idx)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Save every dirty bucket and release the tree.
    pub fn close(mut self) -> BucketResult<()> {
        self.save()?;
        Ok(())
    }

    fn slot(&self, idx: usize) -> &Slot<P> {
        self.slots[idx]
            .as_ref()
            .unwrap_or_else(|| unreachable!("slot {idx} is not resident"))
    }

    fn slot_mut(&mut self, idx: usize) -> &mut Slot<P> {
        self.slots[idx]
            .as_mut()
            .unwrap_or_else(|| unreachable!("slot {idx} is not resident"))
    }

    /// Index of the resident bucket for `directory`, loading it if needed.
    fn resident(&mut self, directory: &WorkspacePath) -> BucketResult<usize> {
        self.tick += 1;
        let tick = self.tick;
        if let Some(&idx) = self.directories.get(directory) {
            self.slot_mut(idx).last_used = tick;
            return Ok(idx);
        }

        self.make_room()?;
        let bucket = Bucket::load(
            directory.clone(),
            self.location_for(directory),
            Arc::clone(&self.payload),
        )?;
        let slot = Slot {
            bucket,
            last_used: tick,
            pins: 0,
        };
        let idx = match self.slots.iter().position(Option::is_none) {
            Some(free) => {
                self.slots[free] = Some(slot);
                free
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.directories.insert(directory.clone(), idx);
        Ok(idx)
    }

    fn make_room(&mut self) -> BucketResult<()> {
        while self.directories.len() >= self.config.cache_capacity {
            let victim = self
                .slots
                .iter()
                .enumerate()
                .filter_map(|(idx, slot)| slot.as_ref().map(|slot| (idx, slot)))
                .filter(|(idx, slot)| slot.pins == 0 && Some(*idx) != self.current)
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(idx, _)| idx);
            match victim {
                Some(idx) => self.evict_slot(idx)?,
                None => {
                    debug!(
                        resident = self.directories.len(),
                        capacity = self.config.cache_capacity,
                        "every resident bucket is in use; exceeding cache capacity"
                    );
                    break;
                }
            }
        }
        Ok(())
    }

    fn evict_slot(&mut self, idx: usize) -> BucketResult<()> {
        // Save first: a failed save leaves the bucket resident with its data.
        self.slot_mut(idx).bucket.save()?;
        if let Some(slot) = self.slots[idx].take() {
            debug!(directory = %slot.bucket.directory(), "bucket evicted");
            self.directories.remove(slot.bucket.directory());
        }
        if self.current == Some(idx) {
            self.current = None;
        }
        Ok(())
    }

    fn visit_children<V>(
        &mut self,
        visitor: &mut V,
        directory: &WorkspacePath,
        depth: Depth,
    ) -> BucketResult<VisitOutcome>
    where
        V: Visitor<P::Value> + ?Sized,
    {
        let idx = self.resident(directory)?;
        self.slot_mut(idx).pins += 1;
        let result = self.visit_pinned(visitor, idx, directory, depth);
        self.slot_mut(idx).pins -= 1;
        result
    }

    fn visit_pinned<V>(
        &mut self,
        visitor: &mut V,
        idx: usize,
        directory: &WorkspacePath,
        depth: Depth,
    ) -> BucketResult<VisitOutcome>
    where
        V: Visitor<P::Value> + ?Sized,
    {
        let below = depth.below();
        let subdirectories = if below.includes_children() {
            self.child_directories(directory)?
        } else {
            BTreeSet::new()
        };
        let mut children: BTreeSet<WorkspacePath> = self
            .slot(idx)
            .bucket
            .paths()
            .filter(|path| directory.is_parent_of(path))
            .cloned()
            .collect();
        children.extend(subdirectories.iter().cloned());

        for child in &children {
            let outcome = self
                .slot_mut(idx)
                .bucket
                .visit_entry(child, visitor)
                .unwrap_or(VisitOutcome::Continue);
            match outcome {
                VisitOutcome::Stop => return Ok(VisitOutcome::Stop),
                VisitOutcome::Prune => continue,
                VisitOutcome::Continue => {}
            }
            if subdirectories.contains(child)
                && self.visit_children(visitor, child, below)? == VisitOutcome::Stop
            {
                return Ok(VisitOutcome::Stop);
            }
        }
        Ok(VisitOutcome::Continue)
    }

    /// Returns `true` if any bucket may exist at or below `directory`.
    fn has_subtree(&self, directory: &WorkspacePath) -> bool {
        self.location_for(directory).is_dir()
            || self.directories.keys().any(|d| directory.is_prefix_of(d))
    }

    /// Direct child directories of `directory` that may hold buckets: those
    /// present on disk plus those reachable through resident (possibly
    /// unsaved) buckets.
    fn child_directories(
        &self,
        directory: &WorkspacePath,
    ) -> BucketResult<BTreeSet<WorkspacePath>> {
        let mut children = BTreeSet::new();
        let location = self.location_for(directory);

        match fs::read_dir(&location) {
            Ok(listing) => {
                for entry in listing {
                    let entry = entry.map_err(|e| read_failed(&location, e))?;
                    let is_dir = entry
                        .file_type()
                        .map_err(|e| read_failed(&location, e))?
                        .is_dir();
                    if !is_dir {
                        continue;
                    }
                    let name = entry.file_name();
                    match name.to_str().and_then(decode_segment) {
                        Some(segment) => {
                            children.insert(directory.append(&segment));
                        }
                        None => warn!(
                            location = %location.display(),
                            name = ?name,
                            "ignoring unrecognised bucket directory"
                        ),
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(read_failed(&location, e)),
        }

        let depth = directory.segment_count();
        children.extend(
            self.directories
                .keys()
                .filter(|d| d.segment_count() > depth && directory.is_prefix_of(d))
                .map(|d| d.truncate(depth + 1)),
        );
        Ok(children)
    }
}

fn read_failed(location: &Path, error: io::Error) -> BucketError {
    BucketError::ReadMetadata {
        location: location.to_path_buf(),
        source: error.into(),
    }
}
