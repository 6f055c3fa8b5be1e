use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lsforge_runner::{CancelFlag, Converter, ProgressSink, RunStatus};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::debug;

/// Default bounded worker pool size.
pub const DEFAULT_WORKERS: usize = 4;

/// One file conversion request.
#[derive(Clone, Debug, Serialize)]
pub struct BatchRequest {
    pub source: PathBuf,
    /// Target format name (`lsf`, `lsx`, `lsj`, ...). Also the produced
    /// file's extension.
    pub target_format: String,
}

/// Per-file terminal state.
///
/// ```text
///   Queued → Running → (Succeeded | Failed | Cancelled)
/// ```
///
/// Only terminal states appear in results; `Queued`/`Running` exist for
/// progress observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BatchStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Outcome of one batch item.
#[derive(Clone, Debug, Serialize)]
pub struct BatchItemResult {
    pub source: PathBuf,
    pub target: PathBuf,
    pub status: BatchStatus,
    /// Tool stdout on success, error text on failure.
    pub output: String,
}

impl BatchItemResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == BatchStatus::Succeeded
    }
}

/// Fans out many single-file conversions over a bounded worker pool.
///
/// Results come back ordered by input position regardless of completion
/// order. Cancellation is cooperative: in-flight conversions are
/// interrupted through their process monitors, queued ones are skipped
/// and reported as `Cancelled`.
pub struct BatchDriver {
    converter: Arc<Converter>,
    workers: usize,
}

impl BatchDriver {
    #[must_use]
    pub fn new(converter: Arc<Converter>) -> Self {
        Self {
            converter,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Override the worker count (minimum 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Run every request, returning one result per request in input
    /// order.
    pub async fn run(
        &self,
        requests: Vec<BatchRequest>,
        output_dir: Option<&Path>,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Vec<BatchItemResult> {
        let total = requests.len();
        if total == 0 {
            progress.done(true, "Nothing to convert");
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let completed = Arc::new(AtomicUsize::new(0));
        let output_dir = output_dir.map(Path::to_path_buf);

        let mut handles = Vec::with_capacity(total);
        for request in requests {
            let converter = Arc::clone(&self.converter);
            let semaphore = Arc::clone(&semaphore);
            let completed = Arc::clone(&completed);
            let cancel = cancel.clone();
            let output_dir = output_dir.clone();

            handles.push(tokio::spawn(async move {
                // The semaphore is never closed; a failed acquire only
                // means shutdown, in which case running unbounded is moot.
                let _permit = semaphore.acquire_owned().await.ok();
                convert_one(&converter, &request, output_dir.as_deref(), &cancel).await
                    .map(|result| (result, completed.fetch_add(1, Ordering::SeqCst) + 1))
            }));
        }

        let mut results = Vec::with_capacity(total);
        for handle in handles {
            match handle.await {
                Ok(Ok((result, done))) => {
                    #[allow(clippy::cast_possible_truncation)]
                    let percent = ((done * 100) / total) as u8;
                    progress.emit(
                        percent,
                        format!(
                            "Converting {}...",
                            result.source.file_name().unwrap_or_default().to_string_lossy()
                        ),
                    );
                    results.push(result);
                }
                Ok(Err(result)) => results.push(result),
                Err(join_error) => {
                    // A panicked worker still yields a per-item failure.
                    results.push(BatchItemResult {
                        source: PathBuf::new(),
                        target: PathBuf::new(),
                        status: BatchStatus::Failed,
                        output: format!("worker panicked: {join_error}"),
                    });
                }
            }
        }

        let succeeded = results.iter().filter(|r| r.success()).count();
        let failed = results.iter().filter(|r| r.status == BatchStatus::Failed).count();
        progress.emit(100, "Batch conversion complete");
        progress.done(
            succeeded > 0 || total == 0,
            format!("{succeeded} succeeded, {failed} failed of {total}"),
        );
        results
    }
}

/// Convert one request. `Err` carries the result for early-outs
/// (cancellation, spawn failure) so the caller treats both arms alike.
async fn convert_one(
    converter: &Converter,
    request: &BatchRequest,
    output_dir: Option<&Path>,
    cancel: &CancelFlag,
) -> Result<BatchItemResult, BatchItemResult> {
    let target = target_path(&request.source, &request.target_format, output_dir);

    if cancel.is_cancelled() {
        return Err(BatchItemResult {
            source: request.source.clone(),
            target,
            status: BatchStatus::Cancelled,
            output: "cancelled".to_string(),
        });
    }

    let source_format = detect_format(&request.source);
    debug!(
        source = %request.source.display(),
        from = source_format,
        to = %request.target_format,
        "batch converting"
    );

    // Same-format requests degrade to a plain copy.
    if source_format == request.target_format {
        return match std::fs::copy(&request.source, &target) {
            Ok(_) => Ok(BatchItemResult {
                source: request.source.clone(),
                target,
                status: BatchStatus::Succeeded,
                output: "File copied (same format)".to_string(),
            }),
            Err(e) => Err(BatchItemResult {
                source: request.source.clone(),
                target,
                status: BatchStatus::Failed,
                output: e.to_string(),
            }),
        };
    }

    let outcome = converter
        .convert_resource(
            &request.source,
            &target,
            source_format,
            &request.target_format,
            &ProgressSink::disabled(),
            cancel,
        )
        .await;

    match outcome {
        Ok(outcome) => {
            let status = match outcome.status {
                RunStatus::Completed => BatchStatus::Succeeded,
                RunStatus::Cancelled => BatchStatus::Cancelled,
                _ => BatchStatus::Failed,
            };
            let result = BatchItemResult {
                source: request.source.clone(),
                target,
                status,
                output: outcome.output().to_string(),
            };
            if result.success() { Ok(result) } else { Err(result) }
        }
        Err(e) => Err(BatchItemResult {
            source: request.source.clone(),
            target,
            status: BatchStatus::Failed,
            output: e.to_string(),
        }),
    }
}

/// Where the converted file lands: beside the source, or under
/// `output_dir`, always `<stem>.<target_format>`.
fn target_path(source: &Path, target_format: &str, output_dir: Option<&Path>) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default();
    let file_name = format!("{}.{target_format}", stem.to_string_lossy());
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => source.with_file_name(file_name),
    }
}

/// Source format from the extension; unknown extensions convert as the
/// textual dialect.
fn detect_format(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("lsj") => "lsj",
        Some("lsf") => "lsf",
        Some("lsb") => "lsb",
        Some("lsbs") => "lsbs",
        Some("lsbc") => "lsbc",
        Some("loca") => "loca",
        _ => "lsx",
    }
}
