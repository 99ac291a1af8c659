use crate::error::{Error, Result};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

const SERVICE: &str = "summarizer";

/// One event from a summarization stream.
///
/// `Partial` and `Done` both carry the full accumulated text so far, never a
/// delta; consumers observe a monotonically non-shrinking string ending in
/// exactly one `Done`.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteEvent {
    Partial(String),
    Done(String),
    Failed(String),
}

/// Text-summarization service consumed by the summarization stage.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Start a streamed summarization of the full transcript. Events arrive
    /// in emission order; dropping the receiver cancels the stream.
    async fn stream_notes(
        &self,
        transcript: &str,
        system_prompt: &str,
    ) -> Result<mpsc::Receiver<NoteEvent>>;
}

/// HTTP client for a streamed chat-completion summarization API.
///
/// The wire format is server-sent-event lines carrying JSON deltas; the
/// client accumulates them and emits cumulative events.
pub struct HttpSummarizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpSummarizer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[async_trait::async_trait]
impl Summarizer for HttpSummarizer {
    async fn stream_notes(
        &self,
        transcript: &str,
        system_prompt: &str,
    ) -> Result<mpsc::Receiver<NoteEvent>> {
        info!(
            "Starting summarization stream ({} transcript chars)",
            transcript.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "stream": true,
                "messages": [
                    { "role": "system", "content": system_prompt },
                    { "role": "user", "content": transcript },
                ],
            }))
            .send()
            .await
            .map_err(|e| Error::Network {
                service: SERVICE,
                message: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| Error::Service {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut full = String::new();

            while let Some(piece) = stream.next().await {
                let piece = match piece {
                    Ok(piece) => piece,
                    Err(e) => {
                        let _ = tx.send(NoteEvent::Failed(e.to_string())).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&piece));

                // Drain complete SSE lines; a partial line stays buffered.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };

                    if data == "[DONE]" {
                        let _ = tx.send(NoteEvent::Done(full.clone())).await;
                        return;
                    }

                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(chunk) => {
                            let delta = chunk
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|choice| choice.delta.content);
                            if let Some(delta) = delta {
                                full.push_str(&delta);
                                if tx.send(NoteEvent::Partial(full.clone())).await.is_err() {
                                    // Receiver dropped: the consumer cancelled.
                                    return;
                                }
                            }
                        }
                        Err(e) => warn!("Skipping malformed stream event: {}", e),
                    }
                }
            }

            let _ = tx
                .send(NoteEvent::Failed(
                    "stream ended without completion marker".to_string(),
                ))
                .await;
        });

        Ok(rx)
    }
}
