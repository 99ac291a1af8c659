use crate::error::{Error, Result};
use crate::pipeline::CancelFlag;
use crate::services::{NoteEvent, Summarizer};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Streams a summarization of the transcript into note text.
///
/// Every cumulative value from the service is republished to the session's
/// watch channel for live display; only the final complete value is returned
/// and thus eligible for persistence. Cancelling drops the service stream
/// and returns `Error::Cancelled`; partial text is never committed.
pub struct SummarizationStage {
    summarizer: Arc<dyn Summarizer>,
    system_prompt: String,
}

impl SummarizationStage {
    pub fn new(summarizer: Arc<dyn Summarizer>, system_prompt: impl Into<String>) -> Self {
        Self {
            summarizer,
            system_prompt: system_prompt.into(),
        }
    }

    pub async fn summarize(
        &self,
        transcript: &str,
        updates: &watch::Sender<String>,
        cancel: &CancelFlag,
    ) -> Result<String> {
        let mut events = self
            .summarizer
            .stream_notes(transcript, &self.system_prompt)
            .await?;

        let mut seen_len = 0usize;

        loop {
            let event = tokio::select! {
                // Dropping the receiver stops the upstream stream task.
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                NoteEvent::Partial(text) => {
                    if text.len() < seen_len {
                        warn!("Dropping shrinking summary update");
                        continue;
                    }
                    seen_len = text.len();
                    let _ = updates.send(text);
                }
                NoteEvent::Done(text) => {
                    info!("Summarization complete ({} chars)", text.len());
                    let _ = updates.send(text.clone());
                    return Ok(text);
                }
                NoteEvent::Failed(reason) => return Err(Error::Summarization(reason)),
            }
        }

        Err(Error::Summarization(
            "stream ended before completion".to_string(),
        ))
    }
}
