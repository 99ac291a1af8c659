use crate::pipeline::PollPolicy;
use std::time::Duration;

/// Configuration for one capture-to-notes session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum chunk length handed to the speech-to-text service.
    /// Default: 120 seconds
    pub max_chunk_secs: u64,

    /// Poll interval and attempt bound for transcription jobs.
    pub poll: PollPolicy,

    /// System prompt steering the note style.
    pub system_prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_chunk_secs: 120,
            poll: PollPolicy {
                interval: Duration::from_secs(2),
                max_attempts: 30,
            },
            system_prompt: "You are a note-taking assistant. Summarize the transcript \
                            into clear, well-organized Markdown notes: a title, main \
                            ideas as top-level bullets, and related points grouped \
                            together. Do not add commentary that is not in the \
                            transcript."
                .to_string(),
        }
    }
}
