pub mod capture;
pub mod clip;
pub mod segment;

pub use capture::{CaptureDevice, MemoryCapture, PlaybackTelemetry, RawRecording};
pub use clip::{probe_decodable, AudioClip};
pub use segment::{Chunk, Segmenter};
