use lsforge_runner::{OperationEvent, ProgressSink};
use tokio::task::JoinHandle;

/// A progress sink whose events print to stderr as they arrive.
///
/// Progress lines render as `[ 42%] message`. `Done` events are
/// swallowed — commands print their own one-line summaries so stdout
/// stays machine-readable. Await the handle after the operation so the
/// tail of the stream flushes before the summary.
pub fn printing_sink() -> (ProgressSink, JoinHandle<()>) {
    let (sink, mut rx) = ProgressSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let OperationEvent::Progress { percent, message } = event {
                eprintln!("[{percent:3}%] {message}");
            }
        }
    });
    (sink, printer)
}
