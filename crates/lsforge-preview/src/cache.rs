use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use tracing::debug;

use crate::record::PreviewRecord;

/// Default number of cached previews.
pub const DEFAULT_CAPACITY: usize = 100;

/// LRU cache of preview records, keyed by absolute path, invalidated by
/// stat drift.
///
/// Every `get` re-stats the file and compares against the mtime+size
/// stamped at insertion; any difference (or a vanished file) evicts the
/// entry and reports a miss. `insert` performs the stamping, so callers
/// never populate the stat fields themselves.
///
/// Thread safety is external — [`PreviewManager`](crate::PreviewManager)
/// wraps the cache in a mutex; standalone users do the same or keep it
/// on one thread.
pub struct PreviewCache {
    entries: LruCache<PathBuf, PreviewRecord>,
}

impl PreviewCache {
    /// A cache bounded to `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up a preview, revalidating against the file's current stat.
    pub fn get(&mut self, path: &Path) -> Option<PreviewRecord> {
        let record = self.entries.get(path)?;

        let valid = std::fs::metadata(path).is_ok_and(|meta| {
            let mtime_matches = match (record.cache_mtime, meta.modified().ok()) {
                (Some(cached), Some(current)) => cached == current,
                _ => false,
            };
            mtime_matches && record.cache_size == Some(meta.len())
        });

        if valid {
            Some(record.clone())
        } else {
            debug!(path = %path.display(), "cached preview stale, evicting");
            self.entries.pop(path);
            None
        }
    }

    /// Cache a preview, stamping it with the file's current mtime+size.
    /// Evicts the least-recently-used entry when over capacity.
    pub fn insert(&mut self, path: PathBuf, mut record: PreviewRecord) {
        if let Ok(meta) = std::fs::metadata(&path) {
            record.cache_mtime = meta.modified().ok();
            record.cache_size = Some(meta.len());
        }
        self.entries.put(path, record);
    }

    /// Drop one entry. Returns whether it was present.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.entries.pop(path).is_some()
    }

    /// Drop every entry under a directory. O(n) over the cache.
    pub fn invalidate_prefix(&mut self, dir: &Path) {
        let stale: Vec<PathBuf> = self
            .entries
            .iter()
            .filter(|(path, _)| path.starts_with(dir))
            .map(|(path, _)| path.clone())
            .collect();
        for path in stale {
            self.entries.pop(&path);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Whether a path currently has an entry, without touching recency
    /// or revalidating.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains(path)
    }
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
