use std::path::Path;
use std::sync::Mutex;

use lsforge_runner::{CancelFlag, ProgressSink};
use tracing::warn;

use crate::cache::PreviewCache;
use crate::engine::PreviewEngine;
use crate::record::PreviewRecord;

/// Cache statistics snapshot.
#[derive(Clone, Copy, Debug)]
pub struct CacheInfo {
    pub len: usize,
    pub capacity: usize,
}

/// The engine plus its cache — the single owner of shared preview state.
///
/// All mutation of the cache goes through the internal mutex; the lock
/// is held only around cache operations, never across preview
/// generation, so a slow converter-backed preview does not serialize
/// unrelated lookups.
pub struct PreviewManager {
    engine: PreviewEngine,
    cache: Mutex<PreviewCache>,
}

impl PreviewManager {
    #[must_use]
    pub fn new(engine: PreviewEngine, capacity: usize) -> Self {
        Self {
            engine,
            cache: Mutex::new(PreviewCache::new(capacity)),
        }
    }

    /// Cached preview lookup: validate-and-hit, or generate and fill.
    ///
    /// Error records are returned but never cached, so a transient
    /// failure does not stick until invalidation.
    pub async fn get_preview(
        &self,
        path: &Path,
        use_cache: bool,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> PreviewRecord {
        if use_cache
            && let Some(hit) = self.lock().get(path)
        {
            return hit;
        }

        let record = self.engine.preview_with_progress(path, progress, cancel).await;

        if use_cache && !record.is_error() {
            let mut cache = self.lock();
            cache.insert(path.to_path_buf(), record.clone());
            // Hand back the stamped copy so the caller sees the same
            // record a later hit would return.
            if let Some(stamped) = cache.get(path) {
                return stamped;
            }
        }
        record
    }

    /// Warm the cache for a set of paths. Failures are skipped; overall
    /// progress is reported per file.
    pub async fn preload(&self, paths: &[std::path::PathBuf], progress: &ProgressSink, cancel: &CancelFlag) {
        let total = paths.len();
        for (i, path) in paths.iter().enumerate() {
            if cancel.is_cancelled() {
                progress.done(false, "cancelled");
                return;
            }
            #[allow(clippy::cast_possible_truncation)]
            let percent = ((i * 100) / total.max(1)) as u8;
            progress.emit(
                percent,
                format!("Preloading {}", crate::record::filename_of(path)),
            );

            if self.lock().contains(path) {
                continue;
            }
            let record = self
                .get_preview(path, true, &ProgressSink::disabled(), cancel)
                .await;
            if record.is_error() {
                warn!(path = %path.display(), "preload failed, skipping");
            }
        }
        progress.emit(100, format!("Preloaded {total} files"));
        progress.done(true, format!("Preloaded {total} files"));
    }

    pub fn invalidate_dir(&self, dir: &Path) {
        self.lock().invalidate_prefix(dir);
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.lock().remove(path)
    }

    pub fn clear_cache(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn cache_info(&self) -> CacheInfo {
        let cache = self.lock();
        CacheInfo {
            len: cache.len(),
            capacity: cache.capacity(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PreviewCache> {
        // A poisoned cache mutex only means another preview panicked;
        // the cache itself is still coherent.
        self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PreviewManager {
        PreviewManager::new(PreviewEngine::new(), 10)
    }

    const LSX: &str = "<save><region id=\"r\"><node id=\"n\"/></region></save>";

    #[tokio::test]
    async fn second_lookup_hits_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.lsx");
        std::fs::write(&path, LSX).unwrap();

        let manager = manager();
        let sink = ProgressSink::disabled();
        let cancel = CancelFlag::new();
        manager.get_preview(&path, true, &sink, &cancel).await;
        assert_eq!(manager.cache_info().len, 1);

        let hit = manager.get_preview(&path, true, &sink, &cancel).await;
        assert!(hit.cache_size.is_some());
    }

    #[tokio::test]
    async fn rewritten_file_misses_and_refills() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.lsx");
        std::fs::write(&path, LSX).unwrap();

        let manager = manager();
        let sink = ProgressSink::disabled();
        let cancel = CancelFlag::new();
        let first = manager.get_preview(&path, true, &sink, &cancel).await;

        std::fs::write(&path, format!("{LSX}  \n<!-- touched -->")).unwrap();
        let second = manager.get_preview(&path, true, &sink, &cancel).await;
        assert_ne!(first.cache_size, second.cache_size);
    }

    #[tokio::test]
    async fn error_records_are_not_cached() {
        let manager = manager();
        let record = manager
            .get_preview(
                Path::new("/nonexistent/x.lsx"),
                true,
                &ProgressSink::disabled(),
                &CancelFlag::new(),
            )
            .await;
        assert!(record.is_error());
        assert_eq!(manager.cache_info().len, 0);
    }

    #[tokio::test]
    async fn preload_fills_cache_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..3 {
            let path = dir.path().join(format!("f{i}.lsx"));
            std::fs::write(&path, LSX).unwrap();
            paths.push(path);
        }

        let manager = manager();
        let (sink, mut rx) = ProgressSink::channel();
        manager.preload(&paths, &sink, &CancelFlag::new()).await;
        assert_eq!(manager.cache_info().len, 3);

        let mut done = false;
        while let Ok(event) = rx.try_recv() {
            if let lsforge_runner::OperationEvent::Done { success, .. } = event {
                done = success;
            }
        }
        assert!(done);
    }
}
