//! Error taxonomy shared by the pipeline, the library store, and the HTTP
//! surface.
//!
//! Per-chunk transcription failures are handled inside the transcription
//! stage (placeholder text) and never surface here; everything else aborts
//! the stage it occurred in and carries enough structure for callers to map
//! it to a session error state or an HTTP status.

use serde::Serialize;
use uuid::Uuid;

/// The pipeline stage a failure occurred in, carried by session error states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Segmenting,
    Transcribing,
    Summarizing,
    Persisting,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Segmenting => "segmenting",
            Stage::Transcribing => "transcribing",
            Stage::Summarizing => "summarizing",
            Stage::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("capture or file access denied: {0}")]
    Permission(String),

    #[error("audio could not be decoded: {0}")]
    Decode(String),

    #[error("recording contains no audio")]
    EmptyAudio,

    #[error("network failure talking to {service}: {message}")]
    Network {
        service: &'static str,
        message: String,
    },

    #[error("{service} rejected the request: {message}")]
    Service {
        service: &'static str,
        message: String,
    },

    #[error("polling gave up after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("store write failed: {0}")]
    Persistence(String),

    /// A pipeline is already running for this session's item.
    #[error("session is busy")]
    Busy,

    /// `start()` called while the session is not idle.
    #[error("session is already active")]
    AlreadyActive,

    /// The session is in a failed state and must be reset before reuse.
    #[error("session is in a failed state; reset it first")]
    Faulted,

    /// `generate()` called for an item that has no audio attached.
    #[error("item has no audio attached")]
    MissingAudio,

    /// Every chunk failed transcription; nothing usable was produced.
    #[error("all {count} chunks failed to transcribe")]
    Transcription { count: usize },

    #[error("summarization failed: {0}")]
    Summarization(String),

    /// The pipeline was cancelled by the user; nothing further was persisted.
    #[error("pipeline cancelled")]
    Cancelled,

    #[error("folder not found: {0}")]
    FolderNotFound(Uuid),

    #[error("item not found: {0}")]
    ItemNotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}
