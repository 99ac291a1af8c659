use super::config::SessionConfig;
use super::status::{SessionState, SessionStatus};
use crate::audio::{AudioClip, CaptureDevice, Segmenter};
use crate::error::{Error, Result, Stage};
use crate::pipeline::{CancelFlag, SummarizationStage, TranscriptionStage};
use crate::services::{SpeechToText, Summarizer};
use crate::store::{ItemState, Library, PersistenceCoordinator};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// The state machine owning one item's capture-to-notes lifecycle.
///
/// A session owns exactly one item at a time; sequencing is single-pipeline
/// per session, so `generate()` refuses to run while any non-terminal state
/// is active. Independent sessions for different items share nothing but the
/// durable store.
pub struct RecordingSession {
    /// Item this session currently owns (`rebind` swaps it)
    item: RwLock<Uuid>,

    /// Capture/playback device
    device: Mutex<Box<dyn CaptureDevice>>,

    /// Pipeline stage wiring
    transcriber: TranscriptionStage,
    summarization: SummarizationStage,

    /// Shared durable store handles
    library: Library,
    persistence: PersistenceCoordinator,

    config: SessionConfig,

    /// Externally observable state
    state: Mutex<SessionState>,

    /// Latest streamed note text while summarizing
    note_updates: watch::Sender<String>,

    /// Cooperative cancellation for the running pipeline
    cancel: CancelFlag,
}

impl RecordingSession {
    /// Create a session bound to an existing item. The initial state
    /// reflects whether the item already has audio attached.
    pub async fn new(
        item: Uuid,
        device: Box<dyn CaptureDevice>,
        stt: Arc<dyn SpeechToText>,
        summarizer: Arc<dyn Summarizer>,
        library: Library,
        persistence: PersistenceCoordinator,
        config: SessionConfig,
    ) -> Result<Self> {
        let initial = match library.item_state(item).await? {
            ItemState::NoAudio => SessionState::Idle,
            _ => SessionState::Stopped,
        };

        let (note_updates, _) = watch::channel(String::new());

        Ok(Self {
            item: RwLock::new(item),
            device: Mutex::new(device),
            transcriber: TranscriptionStage::new(stt, config.poll.clone()),
            summarization: SummarizationStage::new(summarizer, config.system_prompt.clone()),
            library,
            persistence,
            config,
            state: Mutex::new(initial),
            note_updates,
            cancel: CancelFlag::new(),
        })
    }

    pub async fn item(&self) -> Uuid {
        *self.item.read().await
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Point-in-time snapshot for the status API.
    pub async fn status(&self) -> SessionStatus {
        let state = self.state.lock().await.clone();
        let telemetry = self.device.lock().await.telemetry();
        let streamed_chars = self.note_updates.borrow().len();
        SessionStatus {
            state,
            telemetry,
            streamed_chars,
        }
    }

    /// Subscribe to streamed note text. Values are cumulative and delivered
    /// in emission order; the channel resets to empty at each new run.
    pub fn note_updates(&self) -> watch::Receiver<String> {
        self.note_updates.subscribe()
    }

    /// Begin capturing. Only valid from `Idle`.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state != SessionState::Idle {
            return Err(Error::AlreadyActive);
        }

        self.device.lock().await.start_capture().await?;
        *state = SessionState::Recording;
        info!("Recording started for item {}", *self.item.read().await);
        Ok(())
    }

    /// Stop capturing and attach the recorded blob to the session's item.
    /// The blob is validated decodable before acceptance.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state != SessionState::Recording {
            warn!("Stop requested while not recording");
            return Ok(());
        }

        let recording = self.device.lock().await.stop_capture().await?;
        let item = *self.item.read().await;

        match self
            .library
            .attach_audio(item, &recording.name, &recording.bytes)
            .await
        {
            Ok(()) => {
                *state = SessionState::Stopped;
                info!("Recording stopped and attached to item {}", item);
                Ok(())
            }
            Err(e) => {
                // The capture produced nothing usable; the item still has
                // no audio.
                *state = SessionState::Idle;
                Err(e)
            }
        }
    }

    /// Attach an externally imported blob to the session's item.
    pub async fn import(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock().await;
        match &*state {
            SessionState::Idle | SessionState::Stopped => {}
            SessionState::Error { .. } => return Err(Error::Faulted),
            _ => return Err(Error::Busy),
        }

        let item = *self.item.read().await;
        self.library.attach_audio(item, name, bytes).await?;
        *state = SessionState::Stopped;
        Ok(())
    }

    /// Run the full recording-to-notes pipeline for the session's item:
    /// segment, transcribe sequentially, persist the transcript, stream the
    /// summarization, persist the final note.
    pub async fn generate(&self) -> Result<()> {
        // Claim the pipeline under the state lock so a concurrent call
        // observes Transcribing and gets Busy.
        {
            let mut state = self.state.lock().await;
            match &*state {
                SessionState::Stopped => {}
                SessionState::Idle => return Err(Error::MissingAudio),
                SessionState::Error { .. } => return Err(Error::Faulted),
                _ => return Err(Error::Busy),
            }
            *state = SessionState::Transcribing;
        }

        self.cancel.clear();
        let _ = self.note_updates.send(String::new());

        let item = *self.item.read().await;
        info!("Generating notes for item {}", item);

        match self.run_pipeline(item).await {
            Ok(()) => {
                self.set_state(SessionState::Stopped).await;
                info!("Notes generated for item {}", item);
                Ok(())
            }
            Err((_, Error::Cancelled)) => {
                // cancel() already parked the session in a stable state;
                // nothing past the last commit was persisted.
                info!("Pipeline cancelled for item {}", item);
                Err(Error::Cancelled)
            }
            Err((stage, e)) => {
                if self.cancel.is_cancelled() {
                    info!("Pipeline cancelled for item {}", item);
                    return Err(Error::Cancelled);
                }
                warn!("Pipeline failed while {}: {}", stage, e);
                self.set_state(SessionState::Error {
                    stage,
                    message: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self, item: Uuid) -> std::result::Result<(), (Stage, Error)> {
        let (_, bytes) = self
            .library
            .load_audio(item)
            .await
            .map_err(|e| (Stage::Persisting, e))?
            .ok_or((Stage::Segmenting, Error::MissingAudio))?;

        let clip = AudioClip::decode(&bytes).map_err(|e| (Stage::Segmenting, e))?;
        let chunks = Segmenter::new(self.config.max_chunk_secs)
            .segment(&clip)
            .map_err(|e| (Stage::Segmenting, e))?;

        let transcript = self
            .transcriber
            .transcribe(&chunks, &self.cancel)
            .await
            .map_err(|e| (Stage::Transcribing, e))?;

        // The transcript is durable from here on; a later summarization
        // failure leaves it in place.
        self.persistence
            .save_transcript(item, &transcript)
            .await
            .map_err(|e| (Stage::Persisting, e))?;

        self.set_state(SessionState::Summarizing).await;

        let note = self
            .summarization
            .summarize(&transcript, &self.note_updates, &self.cancel)
            .await
            .map_err(|e| (Stage::Summarizing, e))?;

        self.persistence
            .save_note(item, &note)
            .await
            .map_err(|e| (Stage::Persisting, e))?;

        Ok(())
    }

    /// Cancel the running pipeline. The session immediately returns to
    /// `Stopped` (audio present) or `Idle`; in-flight remote results are
    /// discarded and never persisted.
    pub async fn cancel(&self) -> Result<()> {
        self.cancel.cancel();

        let item = *self.item.read().await;
        let has_audio = !matches!(self.library.item_state(item).await?, ItemState::NoAudio);

        let mut state = self.state.lock().await;
        *state = if has_audio {
            SessionState::Stopped
        } else {
            SessionState::Idle
        };
        info!("Session cancelled for item {}", item);
        Ok(())
    }

    /// Return a faulted or stable session to `Stopped`/`Idle`.
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.is_terminal() {
            return Err(Error::Busy);
        }

        let item = *self.item.read().await;
        let has_audio = !matches!(self.library.item_state(item).await?, ItemState::NoAudio);

        self.cancel.clear();
        let _ = self.note_updates.send(String::new());
        *state = if has_audio {
            SessionState::Stopped
        } else {
            SessionState::Idle
        };
        Ok(())
    }

    /// Bind the session to a different item, clearing all transient state:
    /// streamed text, cancel flag, telemetry expectations.
    pub async fn rebind(&self, new_item: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.is_terminal() {
            return Err(Error::Busy);
        }

        let item_state = self.library.item_state(new_item).await?;

        *self.item.write().await = new_item;
        self.cancel.clear();
        let _ = self.note_updates.send(String::new());
        *state = match item_state {
            ItemState::NoAudio => SessionState::Idle,
            _ => SessionState::Stopped,
        };
        info!("Session rebound to item {}", new_item);
        Ok(())
    }

    /// Play back the item's audio.
    pub async fn play(&self) -> Result<()> {
        if *self.state.lock().await == SessionState::Recording {
            return Err(Error::AlreadyActive);
        }

        let item = *self.item.read().await;
        let Some((_, bytes)) = self.library.load_audio(item).await? else {
            return Err(Error::MissingAudio);
        };
        self.device.lock().await.play(&bytes).await
    }

    pub async fn stop_playback(&self) -> Result<()> {
        self.device.lock().await.stop_playback().await
    }

    async fn set_state(&self, next: SessionState) {
        *self.state.lock().await = next;
    }
}
