use crate::audio::clip::AudioClip;
use crate::error::{Error, Result};
use std::time::Instant;
use tracing::{info, warn};

/// Raw captured audio plus its display name, as handed back by a device
/// when capture stops.
#[derive(Debug, Clone)]
pub struct RawRecording {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Elapsed/total position exposed while recording or playing back.
///
/// Front-ends poll this on a fixed interval (100ms or so) for progress
/// display; values update monotonically for the life of one capture or
/// playback.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PlaybackTelemetry {
    pub elapsed_secs: f64,
    pub duration_secs: f64,
}

impl PlaybackTelemetry {
    pub fn idle() -> Self {
        Self {
            elapsed_secs: 0.0,
            duration_secs: 0.0,
        }
    }
}

/// Capture/playback device trait
///
/// The real device (microphone, audio session) is an external collaborator;
/// sessions only rely on this contract. Implementations:
/// - `MemoryCapture`: deterministic in-memory device for tests and
///   import-only deployments
/// - platform devices live out of tree
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Begin capturing audio. Fails with `Error::Permission` when the
    /// underlying device access is denied.
    async fn start_capture(&mut self) -> Result<()>;

    /// Stop capturing and hand back the encoded recording.
    async fn stop_capture(&mut self) -> Result<RawRecording>;

    /// Begin playback of an encoded blob.
    async fn play(&mut self, bytes: &[u8]) -> Result<()>;

    /// Stop playback.
    async fn stop_playback(&mut self) -> Result<()>;

    /// Current elapsed/duration values for the active capture or playback.
    fn telemetry(&self) -> PlaybackTelemetry;

    /// Check if the device is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// In-memory capture device.
///
/// `stop_capture` returns a preloaded blob, so session flows are fully
/// deterministic. Telemetry is wall-clock driven like a real device's.
pub struct MemoryCapture {
    recording_name: String,
    canned: Vec<u8>,
    permitted: bool,
    capture_started: Option<Instant>,
    playback: Option<(Instant, f64)>,
}

impl MemoryCapture {
    /// Device that "records" the given blob.
    pub fn new(recording_name: impl Into<String>, canned: Vec<u8>) -> Self {
        Self {
            recording_name: recording_name.into(),
            canned,
            permitted: true,
            capture_started: None,
            playback: None,
        }
    }

    /// Device whose capture access is denied, for permission-path tests.
    pub fn denied() -> Self {
        Self {
            recording_name: String::new(),
            canned: Vec::new(),
            permitted: false,
            capture_started: None,
            playback: None,
        }
    }
}

impl Default for MemoryCapture {
    fn default() -> Self {
        Self::new("untitled-recording.wav", Vec::new())
    }
}

#[async_trait::async_trait]
impl CaptureDevice for MemoryCapture {
    async fn start_capture(&mut self) -> Result<()> {
        if !self.permitted {
            return Err(Error::Permission("capture access denied".to_string()));
        }
        if self.capture_started.is_some() {
            warn!("Capture already started");
            return Ok(());
        }

        info!("Capture started ({})", self.recording_name);
        self.capture_started = Some(Instant::now());
        Ok(())
    }

    async fn stop_capture(&mut self) -> Result<RawRecording> {
        self.capture_started = None;
        info!(
            "Capture stopped, {} bytes recorded",
            self.canned.len()
        );
        Ok(RawRecording {
            name: self.recording_name.clone(),
            bytes: self.canned.clone(),
        })
    }

    async fn play(&mut self, bytes: &[u8]) -> Result<()> {
        if self.capture_started.is_some() {
            warn!("Cannot play while capturing");
            return Ok(());
        }

        let duration = AudioClip::decode(bytes)?.duration_seconds();
        self.playback = Some((Instant::now(), duration));
        info!("Playback started ({:.1}s)", duration);
        Ok(())
    }

    async fn stop_playback(&mut self) -> Result<()> {
        self.playback = None;
        info!("Playback stopped");
        Ok(())
    }

    fn telemetry(&self) -> PlaybackTelemetry {
        if let Some(started) = self.capture_started {
            let elapsed = started.elapsed().as_secs_f64();
            return PlaybackTelemetry {
                elapsed_secs: elapsed,
                duration_secs: elapsed,
            };
        }

        if let Some((started, duration)) = self.playback {
            return PlaybackTelemetry {
                elapsed_secs: started.elapsed().as_secs_f64().min(duration),
                duration_secs: duration,
            };
        }

        PlaybackTelemetry::idle()
    }

    fn is_capturing(&self) -> bool {
        self.capture_started.is_some()
    }

    fn name(&self) -> &str {
        "memory"
    }
}
