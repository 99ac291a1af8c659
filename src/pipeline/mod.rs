//! The recording-to-notes pipeline stages.
//!
//! One `generate()` run segments an item's audio, transcribes the chunks
//! strictly in order, persists the transcript, then streams a summarization
//! into note text. Stages are sequenced by the owning session; each checks
//! the shared cancel flag at its suspension points.

pub mod summarize;
pub mod transcribe;

pub use summarize::SummarizationStage;
pub use transcribe::{PollPolicy, TranscriptionStage};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cooperative cancellation flag shared between a session and its running
/// pipeline.
///
/// Cancellation does not interrupt an in-flight remote call; the result of
/// such a call is discarded at the next check and never persisted.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<Inner>);

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the flag is raised. Stages select on this against their
    /// own suspension points so a stalled stream still cancels promptly.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                break;
            }
            notified.await;
        }
    }

    /// Re-arm the flag for a new pipeline run.
    pub fn clear(&self) {
        self.0.cancelled.store(false, Ordering::SeqCst);
    }
}
