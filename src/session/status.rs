use crate::audio::PlaybackTelemetry;
use crate::error::Stage;
use serde::Serialize;

/// Externally observable session state.
///
/// `Idle`, `Stopped`, and `Error` are the terminal-stable states; the rest
/// are transient phases of capture or of one `generate()` run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    Stopped,
    Transcribing,
    Summarizing,
    Error { stage: Stage, message: String },
}

impl SessionState {
    /// Whether the session is safe to rebind or reconfigure.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Stopped | SessionState::Error { .. }
        )
    }
}

/// Point-in-time snapshot of a session, as reported over the API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    #[serde(flatten)]
    pub state: SessionState,

    /// Elapsed/duration values for the active capture or playback.
    pub telemetry: PlaybackTelemetry,

    /// Length of the streamed note text accumulated so far, if any.
    pub streamed_chars: usize,
}
