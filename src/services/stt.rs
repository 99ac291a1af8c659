use crate::error::{Error, Result};
use serde::Deserialize;
use tracing::{debug, info};

const SERVICE: &str = "speech-to-text";

/// Opaque handle for a submitted transcription job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(pub String);

/// Job state as reported by the remote service.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Done(String),
    Failed(String),
}

/// Speech-to-text service consumed by the transcription stage.
///
/// The service is at-least-eventually-consistent: callers own the poll loop
/// and its bounds. Submissions are never retried, to avoid duplicate remote
/// side effects.
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    /// Upload one audio chunk and start a transcription job.
    async fn submit(&self, audio: &[u8]) -> Result<JobHandle>;

    /// Poll a submitted job once.
    async fn poll(&self, job: &JobHandle) -> Result<JobStatus>;
}

/// HTTP client for an upload/submit/poll transcription API.
pub struct HttpSpeechToText {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpSpeechToText {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: String,
    text: Option<String>,
    error: Option<String>,
}

#[async_trait::async_trait]
impl SpeechToText for HttpSpeechToText {
    async fn submit(&self, audio: &[u8]) -> Result<JobHandle> {
        debug!("Uploading {} byte chunk to {}", audio.len(), SERVICE);

        let upload: UploadResponse = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("authorization", &self.api_key)
            .header("content-type", "application/octet-stream")
            .body(audio.to_vec())
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
            })?
            .json()
            .await
            .map_err(|e| Error::Service {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let job: SubmitResponse = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&serde_json::json!({ "audio_url": upload.upload_url }))
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
            })?
            .json()
            .await
            .map_err(|e| Error::Service {
                service: SERVICE,
                message: e.to_string(),
            })?;

        info!("Submitted transcription job {}", job.id);
        Ok(JobHandle(job.id))
    }

    async fn poll(&self, job: &JobHandle) -> Result<JobStatus> {
        let status: PollResponse = self
            .client
            .get(format!("{}/transcript/{}", self.base_url, job.0))
            .header("authorization", &self.api_key)
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
            })?
            .json()
            .await
            .map_err(|e| Error::Service {
                service: SERVICE,
                message: e.to_string(),
            })?;

        match status.status.as_str() {
            "completed" => Ok(JobStatus::Done(status.text.unwrap_or_default())),
            "error" => Ok(JobStatus::Failed(
                status
                    .error
                    .unwrap_or_else(|| "unspecified transcription error".to_string()),
            )),
            _ => Ok(JobStatus::Pending),
        }
    }
}
