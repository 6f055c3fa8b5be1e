use lsforge_runner::RunnerError;

/// Errors from the conversion pipeline.
///
/// Per-file conversion failures are NOT errors — the scanner,
/// orchestrator, and batch driver all accumulate those into their
/// result values and keep going. An `Err` here means the operation as a
/// whole could not continue: the workspace copy failed, a spawn failed,
/// or cancellation was observed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Cooperative cancellation observed at a checkpoint.
    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
