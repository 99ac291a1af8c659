//! Clients for the two remote services the pipeline consumes.
//!
//! Both are trait seams so sessions can be driven against deterministic
//! in-process implementations in tests; the HTTP implementations talk to the
//! real endpoints.

pub mod stt;
pub mod summarizer;

pub use stt::{HttpSpeechToText, JobHandle, JobStatus, SpeechToText};
pub use summarizer::{HttpSummarizer, NoteEvent, Summarizer};
