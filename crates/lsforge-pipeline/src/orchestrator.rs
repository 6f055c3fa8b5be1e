use std::path::{Path, PathBuf};

use lsforge_runner::{CancelFlag, Converter, ProgressSink};
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::PipelineError;
use crate::scanner::scan_workspace;

/// One conversion performed (or attempted) during workspace preparation.
#[derive(Clone, Debug)]
pub struct PreparedConversion {
    /// The file in the caller's source tree. Never touched.
    pub original: PathBuf,
    /// The copy inside the staging area that was converted.
    pub staged: PathBuf,
    /// The produced binary target inside the staging area.
    pub target: PathBuf,
    pub success: bool,
}

/// Result of preparing a workspace for packaging.
///
/// When no conversions were needed, `staging_root` is the caller's own
/// source tree and `owns_staging` is false — nothing to tear down. When
/// conversions ran, `staging_root` is a converted copy under a temporary
/// directory owned by this value: dropping it (or calling
/// [`cleanup`](Self::cleanup)) removes the whole staging area, which
/// also covers the error path when preparation fails partway.
#[derive(Debug)]
pub struct WorkspacePrep {
    pub staging_root: PathBuf,
    pub conversions: Vec<PreparedConversion>,
    pub errors: Vec<String>,
    pub owns_staging: bool,
    temp: Option<TempDir>,
}

impl WorkspacePrep {
    /// Remove the staging directory, if this prep owns one.
    ///
    /// # Errors
    ///
    /// Filesystem errors from the removal.
    pub fn cleanup(mut self) -> std::io::Result<()> {
        match self.temp.take() {
            Some(temp) => temp.close(),
            None => Ok(()),
        }
    }

    /// Disown the staging directory so it survives this value, and
    /// return the staging root. No-op for borrowed workspaces.
    #[must_use]
    pub fn persist(mut self) -> PathBuf {
        if let Some(temp) = self.temp.take() {
            let _ = temp.keep();
        }
        self.staging_root.clone()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.conversions.iter().filter(|c| c.success).count()
    }
}

/// Prepares source workspaces for packaging: stage, convert, report.
///
/// ```text
///  source_root ──scan──▶ jobs ──copy──▶ T/workspace ──convert──▶ prep
///                │                           │
///                └─ none: borrow source      └─ .lsx sources deleted
///                                               after each success
/// ```
///
/// The source tree is never modified; all conversions happen in the
/// staging copy. Progress: 5 scan, 10 copy, 30–90 converting, 95
/// finalize, 100 done.
pub struct Orchestrator<'a> {
    converter: &'a Converter,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(converter: &'a Converter) -> Self {
        Self { converter }
    }

    /// Prepare `source_root` for packaging.
    ///
    /// Individual conversion failures accumulate in
    /// [`WorkspacePrep::errors`]; the staging area survives them so the
    /// caller can decide whether a partial result is packageable.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Cancelled`] at any checkpoint, or I/O errors
    /// from the staging copy. Either way the partially-built staging
    /// directory is removed before the error propagates.
    pub async fn prepare_workspace(
        &self,
        source_root: &Path,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<WorkspacePrep, PipelineError> {
        let report = scan_workspace(source_root);
        let total = report.total();

        if total == 0 {
            return Ok(WorkspacePrep {
                staging_root: source_root.to_path_buf(),
                conversions: Vec::new(),
                errors: Vec::new(),
                owns_staging: false,
                temp: None,
            });
        }

        progress.emit(5, format!("Found {total} files to convert"));

        // The TempDir guards the whole preparation: any `?` below drops
        // it, removing the partial staging area.
        let temp = tempfile::Builder::new()
            .prefix("lsforge-workspace-")
            .tempdir()?;
        let staging_root = temp.path().join("workspace");

        progress.emit(10, "Copying workspace to temporary location...");
        copy_tree(source_root, &staging_root, cancel)?;

        progress.emit(30, "Starting file conversions...");
        let mut conversions = Vec::with_capacity(total);
        let mut errors = Vec::new();

        for (processed, job) in report.jobs().enumerate() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let staged = staging_root.join(&job.relative_path);
            let target = staged.with_extension(""); // foo.lsf.lsx → foo.lsf
            debug!(staged = %staged.display(), target = %target.display(), "converting staged file");

            let outcome = self
                .converter
                .convert_resource(
                    &staged,
                    &target,
                    "lsx",
                    &job.target_extension,
                    &ProgressSink::disabled(),
                    cancel,
                )
                .await?;

            let success = outcome.success() && target.is_file();
            if success {
                // The composite-named source has served its purpose;
                // only the binary belongs in the package.
                if let Err(e) = std::fs::remove_file(&staged) {
                    warn!(staged = %staged.display(), "could not remove converted source: {e}");
                }
            } else {
                errors.push(format!(
                    "Conversion failed for {}: {}",
                    job.relative_path.display(),
                    outcome.output()
                ));
            }

            conversions.push(PreparedConversion {
                original: job.source_path.clone(),
                staged,
                target,
                success,
            });

            #[allow(clippy::cast_possible_truncation)]
            let percent = 30 + (((processed + 1) * 60) / total) as u8;
            progress.emit(
                percent,
                format!("Converted {}/{total} files", processed + 1),
            );
        }

        progress.emit(95, "Finalizing prepared workspace...");
        let succeeded = conversions.iter().filter(|c| c.success).count();
        progress.emit(100, format!("Converted {succeeded}/{total} files successfully"));
        progress.done(
            errors.is_empty(),
            format!("Converted {succeeded}/{total} files"),
        );

        Ok(WorkspacePrep {
            staging_root,
            conversions,
            errors,
            owns_staging: true,
            temp: Some(temp),
        })
    }
}

/// Recursive copy preserving the directory shape and file contents.
/// Checks the cancel flag before every file.
fn copy_tree(source: &Path, destination: &Path, cancel: &CancelFlag) -> Result<(), PipelineError> {
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            PipelineError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn workspace_without_jobs_is_borrowed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain.lsx"), "<save/>").unwrap();

        let converter = Converter::new("/nonexistent/divine");
        let prep = Orchestrator::new(&converter)
            .prepare_workspace(dir.path(), &ProgressSink::disabled(), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(prep.staging_root, dir.path());
        assert!(!prep.owns_staging);
        assert!(prep.conversions.is_empty());
        prep.cleanup().unwrap();
        assert!(dir.path().exists());
    }

    #[test]
    fn copy_tree_replicates_structure() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("Mods/Foo")).unwrap();
        std::fs::write(src.path().join("Mods/Foo/meta.lsx"), "<save/>").unwrap();

        let dst = tempfile::tempdir().unwrap();
        let target = dst.path().join("workspace");
        copy_tree(src.path(), &target, &CancelFlag::new()).unwrap();

        assert!(target.join("Mods/Foo/meta.lsx").is_file());
    }

    #[test]
    fn copy_tree_observes_cancellation() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.lsx"), "x").unwrap();

        let cancel = CancelFlag::new();
        cancel.cancel();
        let dst = tempfile::tempdir().unwrap();
        let result = copy_tree(src.path(), &dst.path().join("w"), &cancel);
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    // Conversion behavior against a working fake converter is covered by
    // the integration suite, which ships a converter stub binary.
}
