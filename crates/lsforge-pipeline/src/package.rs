use std::path::{Path, PathBuf};

use lsforge_runner::{CancelFlag, Converter, ConverterCommand, ProgressSink, RunOutcome, Verb};
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::PipelineError;

/// Compression methods the converter accepts when creating packages.
///
/// ```text
/// ┌──────────┬──────────────────────────────────┐
/// │ Method   │ Notes                            │
/// ├──────────┼──────────────────────────────────┤
/// │ none     │ No compression (fastest)         │
/// │ zlib     │ Standard zlib compression        │
/// │ zlibfast │ Fast zlib compression            │
/// │ lz4      │ LZ4 compression (fast)           │
/// │ lz4hc    │ LZ4 high compression (default)   │
/// └──────────┴──────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Compression {
    None,
    Zlib,
    ZlibFast,
    Lz4,
    #[default]
    Lz4Hc,
}

impl Compression {
    /// The converter's `--compression-method` value.
    #[must_use]
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zlib => "zlib",
            Self::ZlibFast => "zlibfast",
            Self::Lz4 => "lz4",
            Self::Lz4Hc => "lz4hc",
        }
    }

    /// Parse a user-supplied method name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let method = match name.to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "zlib" => Self::Zlib,
            "zlibfast" => Self::ZlibFast,
            "lz4" => Self::Lz4,
            "lz4hc" => Self::Lz4Hc,
            _ => return None,
        };
        Some(method)
    }

    /// Every recognized method name, for error messages.
    #[must_use]
    pub fn names() -> &'static [&'static str] {
        &["none", "zlib", "zlibfast", "lz4", "lz4hc"]
    }
}

/// Settings for package creation.
#[derive(Clone, Debug, Default)]
pub struct PackageOptions {
    pub compression: Compression,
    /// Load priority; 0 (the default) is omitted from the command line.
    pub priority: u8,
    pub use_package_name: bool,
}

/// Glob or regex filter over packaged paths, applied converter-side.
#[derive(Clone, Debug)]
pub struct PakFilter {
    pub expression: String,
    pub use_regex: bool,
}

/// Result of extracting one package during a batch extraction.
#[derive(Clone, Debug, Serialize)]
pub struct PakExtractResult {
    pub package: PathBuf,
    pub output_dir: PathBuf,
    pub success: bool,
    pub output: String,
}

/// Basic on-disk facts about a package file.
#[derive(Clone, Debug, Serialize)]
pub struct PakInfo {
    pub name: String,
    pub size: u64,
}

/// Package operations beyond the bare verbs: compression and priority
/// on create, filtered extraction and listing, directory-wide batch
/// extraction.
///
/// The archive format stays opaque — everything here is command
/// shaping around the external converter.
pub struct PakOperations<'a> {
    converter: &'a Converter,
}

impl<'a> PakOperations<'a> {
    #[must_use]
    pub fn new(converter: &'a Converter) -> Self {
        Self { converter }
    }

    /// Create a package with compression/priority settings.
    ///
    /// # Errors
    ///
    /// Spawn/translation failures as [`PipelineError`]; converter-level
    /// failure is in the returned outcome.
    pub async fn create(
        &self,
        source_dir: &Path,
        package: &Path,
        options: &PackageOptions,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, PipelineError> {
        if let Some(parent) = package.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut command = ConverterCommand::new(Verb::CreatePackage)
            .source(source_dir)
            .destination(package)
            .option("compression_method", options.compression.as_arg());
        if options.priority != 0 {
            command = command.option("package_priority", options.priority.to_string());
        }
        if options.use_package_name {
            command = command.option("use_package_name", "true");
        }

        progress.emit(
            10,
            format!("Creating package with {}...", options.compression.as_arg()),
        );
        Ok(self.converter.run(command, progress, cancel).await?)
    }

    /// Extract a package, optionally filtered by a glob or regex over
    /// packaged paths.
    ///
    /// # Errors
    ///
    /// See [`PakOperations::create`].
    pub async fn extract(
        &self,
        package: &Path,
        output_dir: &Path,
        filter: Option<&PakFilter>,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, PipelineError> {
        std::fs::create_dir_all(output_dir)?;

        let mut command = ConverterCommand::new(Verb::ExtractPackage)
            .source(package)
            .destination(output_dir);
        if let Some(filter) = filter {
            command = command.option("expression", &filter.expression);
            if filter.use_regex {
                command = command.option("use_regex", "true");
            }
            progress.emit(15, format!("Extracting with filter: {}", filter.expression));
        }

        Ok(self.converter.run(command, progress, cancel).await?)
    }

    /// List a package's contents, optionally filtered. Returns the
    /// packaged paths (one per line of converter output) together with
    /// the raw outcome; a failed listing yields no entries and the
    /// outcome carries the error text.
    ///
    /// # Errors
    ///
    /// Spawn/translation failures only.
    pub async fn list(
        &self,
        package: &Path,
        filter: Option<&PakFilter>,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<(Vec<String>, RunOutcome), PipelineError> {
        let mut command = ConverterCommand::new(Verb::ListPackage).source(package);
        if let Some(filter) = filter {
            command = command.option("expression", &filter.expression);
            if filter.use_regex {
                command = command.option("use_regex", "true");
            }
        }

        let outcome = self.converter.run(command, progress, cancel).await?;
        let entries = if outcome.success() {
            outcome
                .stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };
        Ok((entries, outcome))
    }

    /// Extract every `.pak` under a directory, each into
    /// `output_base/<package stem>/`. Per-package failures accumulate;
    /// the batch keeps going.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Cancelled`] between packages, or I/O failures
    /// creating output directories.
    pub async fn extract_all(
        &self,
        pak_dir: &Path,
        output_base: &Path,
        filter: Option<&PakFilter>,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<Vec<PakExtractResult>, PipelineError> {
        let packages: Vec<PathBuf> = WalkDir::new(pak_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|name| name.to_ascii_lowercase().ends_with(".pak"))
            })
            .map(|e| e.path().to_path_buf())
            .collect();

        let total = packages.len();
        progress.emit(10, format!("Starting batch extraction of {total} packages..."));

        let mut results = Vec::with_capacity(total);
        for (i, package) in packages.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let stem = package
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("package{i}"));
            let output_dir = output_base.join(stem);
            debug!(package = %package.display(), "extracting package");

            let outcome = self
                .extract(package, &output_dir, filter, &ProgressSink::disabled(), cancel)
                .await?;
            results.push(PakExtractResult {
                package: package.clone(),
                output_dir,
                success: outcome.success(),
                output: outcome.output().to_string(),
            });

            #[allow(clippy::cast_possible_truncation)]
            let percent = 10 + (((i + 1) * 85) / total.max(1)) as u8;
            progress.emit(percent, format!("Extracted {}/{total} packages", i + 1));
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        progress.emit(100, format!("Extracted {succeeded}/{total} packages"));
        progress.done(succeeded > 0 || total == 0, format!("{succeeded}/{total} packages"));
        Ok(results)
    }

    /// Stat-level package facts. No archive decoding.
    ///
    /// # Errors
    ///
    /// I/O errors from the stat.
    pub fn info(package: &Path) -> Result<PakInfo, PipelineError> {
        let meta = std::fs::metadata(package)?;
        Ok(PakInfo {
            name: package
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: meta.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_names_round_trip() {
        for name in Compression::names() {
            let method = Compression::from_name(name).unwrap();
            assert_eq!(method.as_arg(), *name);
        }
        assert_eq!(Compression::from_name("LZ4HC"), Some(Compression::Lz4Hc));
        assert_eq!(Compression::from_name("brotli"), None);
        assert_eq!(Compression::default(), Compression::Lz4Hc);
    }

    #[test]
    fn info_stats_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let pak = dir.path().join("Example.pak");
        std::fs::write(&pak, b"not really a pak").unwrap();

        let info = PakOperations::info(&pak).unwrap();
        assert_eq!(info.name, "Example.pak");
        assert_eq!(info.size, 16);
    }

    #[tokio::test]
    async fn extract_all_without_packages_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let converter = Converter::new("/nonexistent/divine");

        let results = PakOperations::new(&converter)
            .extract_all(
                dir.path(),
                out.path(),
                None,
                &ProgressSink::disabled(),
                &CancelFlag::new(),
            )
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
