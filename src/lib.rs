pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod services;
pub mod session;
pub mod store;

pub use audio::{
    probe_decodable, AudioClip, CaptureDevice, Chunk, MemoryCapture, PlaybackTelemetry,
    RawRecording, Segmenter,
};
pub use config::Config;
pub use error::{Error, Result, Stage};
pub use http::{create_router, AppState};
pub use pipeline::{CancelFlag, PollPolicy, SummarizationStage, TranscriptionStage};
pub use services::{
    HttpSpeechToText, HttpSummarizer, JobHandle, JobStatus, NoteEvent, SpeechToText, Summarizer,
};
pub use session::{RecordingSession, SessionConfig, SessionState, SessionStatus};
pub use store::{Folder, Item, ItemState, Library, PersistenceCoordinator, Store};
