/// Errors from the runner layer — path translation and process spawning.
///
/// Note the deliberate asymmetry with [`RunOutcome`](crate::RunOutcome):
/// a converter invocation that *starts* but then fails, times out, or is
/// cancelled is not an `Err`. Those outcomes are ordinary results the
/// pipeline aggregates per file. `RunnerError` is reserved for problems
/// that prevent an invocation from happening at all.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Path translation requires an absolute host path.
    #[error("path is not absolute: {path}")]
    InvalidPath { path: String },

    /// A path could not be represented in the emulated-drive form
    /// (non-UTF-8 components).
    #[error("path is not representable: {path}")]
    UnrepresentablePath { path: String },

    /// The external converter executable was not found, neither at the
    /// configured location nor on `PATH`.
    #[error("external converter not found: {program}")]
    ToolMissing { program: String },

    /// The child process could not be spawned.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
