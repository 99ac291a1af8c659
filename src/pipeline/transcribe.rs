use crate::audio::Chunk;
use crate::error::{Error, Result};
use crate::pipeline::CancelFlag;
use crate::services::{JobStatus, SpeechToText};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Fixed-interval bounded polling policy for transcription jobs.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

/// Turns an ordered chunk list into one transcript.
///
/// Chunks are processed strictly in index order, one at a time, so output
/// ordering matches audio chronology regardless of remote latency variance.
/// A chunk that fails (service rejection, transport failure, or exhausted
/// polling) leaves a clearly-marked placeholder in its slot; the stage only
/// fails outright when every chunk failed.
pub struct TranscriptionStage {
    stt: Arc<dyn SpeechToText>,
    policy: PollPolicy,
}

impl TranscriptionStage {
    pub fn new(stt: Arc<dyn SpeechToText>, policy: PollPolicy) -> Self {
        Self { stt, policy }
    }

    pub async fn transcribe(&self, chunks: &[Chunk], cancel: &CancelFlag) -> Result<String> {
        if chunks.is_empty() {
            return Err(Error::EmptyAudio);
        }

        let mut texts = Vec::with_capacity(chunks.len());
        let mut failures = 0usize;

        for chunk in chunks {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match self.transcribe_chunk(chunk, cancel).await {
                Ok(text) => texts.push(text),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    warn!("Chunk {} failed: {}", chunk.index + 1, e);
                    failures += 1;
                    texts.push(format!("[transcription failed: chunk {}]", chunk.index + 1));
                }
            }
        }

        if failures == chunks.len() {
            return Err(Error::Transcription { count: failures });
        }

        info!(
            "Transcribed {} chunks ({} failed)",
            chunks.len(),
            failures
        );

        // Blank-line separator keeps chunk boundaries readable.
        Ok(texts.join("\n\n"))
    }

    /// Submit one chunk, then poll to a terminal status.
    ///
    /// The submission itself is never retried; the poll loop is the only
    /// bounded retry.
    async fn transcribe_chunk(&self, chunk: &Chunk, cancel: &CancelFlag) -> Result<String> {
        let job = self.stt.submit(&chunk.bytes).await?;

        for _ in 0..self.policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match self.stt.poll(&job).await? {
                JobStatus::Done(text) => return Ok(text),
                JobStatus::Failed(reason) => {
                    return Err(Error::Service {
                        service: "speech-to-text",
                        message: reason,
                    })
                }
                JobStatus::Pending => tokio::time::sleep(self.policy.interval).await,
            }
        }

        Err(Error::Timeout {
            attempts: self.policy.max_attempts,
        })
    }
}
