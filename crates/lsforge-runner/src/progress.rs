use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tokio::sync::Notify;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Messages a long-running operation sends to whoever is watching it.
///
/// Every long operation (conversion, extraction, batch item, binary
/// preview) owns a sender; the consumer — a UI, the CLI's progress
/// printer, a test — owns the receiver. Exactly two kinds of message
/// exist:
///
/// ```text
///   Progress { percent: 0..=100, message }   zero or more
///   Done     { success, message }            exactly one, last
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationEvent {
    Progress { percent: u8, message: String },
    Done { success: bool, message: String },
}

/// Progress sender with a monotonic floor.
///
/// Percentages inferred from converter output are a lower bound on real
/// progress and must never decrease within one operation. The sink clamps
/// every emission to the highest percentage seen so far, so callers can
/// report raw table values without ordering concerns.
///
/// A disabled sink (no channel) swallows events; operations emit
/// unconditionally and stay oblivious to whether anyone listens.
pub struct ProgressSink {
    tx: Option<UnboundedSender<OperationEvent>>,
    floor: AtomicU8,
}

impl ProgressSink {
    /// A connected sink and its receiving end.
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<OperationEvent>) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                tx: Some(tx),
                floor: AtomicU8::new(0),
            },
            rx,
        )
    }

    /// A sink that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tx: None,
            floor: AtomicU8::new(0),
        }
    }

    /// Emit a progress event, clamped to the monotonic floor.
    pub fn emit(&self, percent: u8, message: impl Into<String>) {
        let percent = percent.min(100);
        let clamped = self.floor.fetch_max(percent, Ordering::Relaxed).max(percent);
        if let Some(tx) = &self.tx {
            let _ = tx.send(OperationEvent::Progress {
                percent: clamped,
                message: message.into(),
            });
        }
    }

    /// Emit the terminal event. Does not reset the floor — sinks are
    /// per-operation, not reused.
    pub fn done(&self, success: bool, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(OperationEvent::Done {
                success,
                message: message.into(),
            });
        }
    }

    /// The highest percentage emitted so far.
    #[must_use]
    pub fn floor(&self) -> u8 {
        self.floor.load(Ordering::Relaxed)
    }
}

/// Cooperative cancellation flag, shared across threads and tasks.
///
/// `cancel()` is idempotent. Operations poll [`is_cancelled`] at their
/// checkpoints (before each spawn, before each copy chunk, between batch
/// items) and the process monitor additionally awaits [`cancelled`] so a
/// running child is interrupted promptly rather than at the next poll.
#[derive(Clone, Default)]
pub struct CancelFlag {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call any number of times, from any
    /// thread.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation has been requested. Returns immediately
    /// if it already was.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        // Re-check after registering interest: cancel() may have landed
        // between the load and notified().
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_floor_is_monotonic() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.emit(30, "extracting");
        sink.emit(90, "nearly done");
        sink.emit(50, "processing"); // late, lower value
        sink.done(true, "ok");

        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let OperationEvent::Progress { percent, .. } = event {
                percents.push(percent);
            }
        }
        assert_eq!(percents, vec![30, 90, 90]);
    }

    #[test]
    fn disabled_sink_swallows_events() {
        let sink = ProgressSink::disabled();
        sink.emit(50, "ignored");
        sink.done(true, "ignored");
        assert_eq!(sink.floor(), 50);
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_wakes_waiters() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());

        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { flag.cancelled().await })
        };

        flag.cancel();
        flag.cancel();
        assert!(flag.is_cancelled());
        waiter.await.unwrap();

        // Already-cancelled flags resolve immediately.
        flag.cancelled().await;
    }
}
