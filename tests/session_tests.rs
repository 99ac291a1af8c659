// Integration tests for the recording session state machine
//
// Sessions are driven end to end against the in-memory capture device and
// scripted remote services: capture lifecycle, pipeline sequencing,
// non-reentrancy, cancellation, failure states, and rebinding.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use voxnotes::audio::MemoryCapture;
use voxnotes::pipeline::PollPolicy;
use voxnotes::services::{JobHandle, JobStatus, NoteEvent, SpeechToText, Summarizer};
use voxnotes::session::{RecordingSession, SessionConfig, SessionState};
use voxnotes::store::{ItemState, Library, PersistenceCoordinator, Store};
use voxnotes::{Error, Stage};

// ============================================================================
// Scripted services and fixtures
// ============================================================================

/// Speech-to-text that completes every chunk on the first poll.
struct InstantStt {
    text: &'static str,
}

#[async_trait::async_trait]
impl SpeechToText for InstantStt {
    async fn submit(&self, _audio: &[u8]) -> voxnotes::Result<JobHandle> {
        Ok(JobHandle("job".to_string()))
    }

    async fn poll(&self, _job: &JobHandle) -> voxnotes::Result<JobStatus> {
        Ok(JobStatus::Done(self.text.to_string()))
    }
}

/// Summarizer that streams two cumulative events and completes.
struct DoneSummarizer;

#[async_trait::async_trait]
impl Summarizer for DoneSummarizer {
    async fn stream_notes(
        &self,
        _transcript: &str,
        _system_prompt: &str,
    ) -> voxnotes::Result<mpsc::Receiver<NoteEvent>> {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            let _ = tx.send(NoteEvent::Partial("# Notes".to_string())).await;
            let _ = tx
                .send(NoteEvent::Done("# Notes\n- the point".to_string()))
                .await;
        });
        Ok(rx)
    }
}

/// Summarizer that sends one partial and then stalls with the stream open.
struct StallingSummarizer;

#[async_trait::async_trait]
impl Summarizer for StallingSummarizer {
    async fn stream_notes(
        &self,
        _transcript: &str,
        _system_prompt: &str,
    ) -> voxnotes::Result<mpsc::Receiver<NoteEvent>> {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            let _ = tx.send(NoteEvent::Partial("draft...".to_string())).await;
            tx.closed().await;
        });
        Ok(rx)
    }
}

/// Summarizer that fails mid-stream.
struct FailingSummarizer;

#[async_trait::async_trait]
impl Summarizer for FailingSummarizer {
    async fn stream_notes(
        &self,
        _transcript: &str,
        _system_prompt: &str,
    ) -> voxnotes::Result<mpsc::Receiver<NoteEvent>> {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            let _ = tx.send(NoteEvent::Partial("draft...".to_string())).await;
            let _ = tx.send(NoteEvent::Failed("upstream died".to_string())).await;
        });
        Ok(rx)
    }
}

fn make_wav_bytes() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..8000 {
            writer.write_sample((i % 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn fast_config() -> SessionConfig {
    SessionConfig {
        max_chunk_secs: 120,
        poll: PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts: 3,
        },
        system_prompt: "summarize".to_string(),
    }
}

/// Build a session over a fresh in-memory store. `with_audio` preattaches a
/// blob so the session starts in `Stopped`.
async fn rig(
    with_audio: bool,
    summarizer: Arc<dyn Summarizer>,
) -> Result<(
    Library,
    PersistenceCoordinator,
    Arc<RecordingSession>,
    uuid::Uuid,
)> {
    let store = Store::open_in_memory()?;
    let library = Library::new(store.clone());
    let persistence = PersistenceCoordinator::new(store);

    let item = library.create_item("Lecture", None).await?;
    if with_audio {
        library
            .attach_audio(item.id, "lecture.wav", &make_wav_bytes())
            .await?;
    }

    let session = Arc::new(
        RecordingSession::new(
            item.id,
            Box::new(MemoryCapture::new("lecture.wav", make_wav_bytes())),
            Arc::new(InstantStt {
                text: "spoken words",
            }),
            summarizer,
            library.clone(),
            persistence.clone(),
            fast_config(),
        )
        .await?,
    );

    Ok((library, persistence, session, item.id))
}

async fn wait_until(
    session: &RecordingSession,
    pred: impl Fn(&SessionState) -> bool,
) {
    for _ in 0..1000 {
        if pred(&session.state().await) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("timed out waiting for session state");
}

// ============================================================================
// Capture lifecycle
// ============================================================================

#[tokio::test]
async fn test_capture_then_generate_persists_transcript_and_note() -> Result<()> {
    let (library, _, session, item) = rig(false, Arc::new(DoneSummarizer)).await?;

    assert_eq!(session.state().await, SessionState::Idle);

    session.start().await?;
    assert_eq!(session.state().await, SessionState::Recording);

    session.stop().await?;
    assert_eq!(session.state().await, SessionState::Stopped);
    assert_eq!(library.item_state(item).await?, ItemState::AudioOnly);

    session.generate().await?;

    assert_eq!(session.state().await, SessionState::Stopped);
    assert_eq!(
        library.load_transcript(item).await?.as_deref(),
        Some("spoken words")
    );
    assert_eq!(
        library.load_note(item).await?.as_deref(),
        Some("# Notes\n- the point")
    );
    assert_eq!(library.item_state(item).await?, ItemState::AudioWithText);

    Ok(())
}

#[tokio::test]
async fn test_start_is_rejected_outside_idle() -> Result<()> {
    let (_, _, session, _) = rig(true, Arc::new(DoneSummarizer)).await?;

    // Stopped session: audio already attached.
    let err = session.start().await.unwrap_err();
    assert!(matches!(err, Error::AlreadyActive));

    Ok(())
}

#[tokio::test]
async fn test_denied_device_surfaces_permission_error() -> Result<()> {
    let store = Store::open_in_memory()?;
    let library = Library::new(store.clone());
    let persistence = PersistenceCoordinator::new(store);
    let item = library.create_item("Denied", None).await?;

    let session = RecordingSession::new(
        item.id,
        Box::new(MemoryCapture::denied()),
        Arc::new(InstantStt { text: "unused" }),
        Arc::new(DoneSummarizer),
        library,
        persistence,
        fast_config(),
    )
    .await?;

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, Error::Permission(_)));
    assert_eq!(session.state().await, SessionState::Idle);

    Ok(())
}

// ============================================================================
// Pipeline sequencing
// ============================================================================

#[tokio::test]
async fn test_generate_without_audio_is_rejected() -> Result<()> {
    let (_, _, session, _) = rig(false, Arc::new(DoneSummarizer)).await?;

    let err = session.generate().await.unwrap_err();
    assert!(matches!(err, Error::MissingAudio));
    assert_eq!(session.state().await, SessionState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_generate_is_non_reentrant() -> Result<()> {
    let (_, _, session, _) = rig(true, Arc::new(StallingSummarizer)).await?;

    let runner = Arc::clone(&session);
    let handle = tokio::spawn(async move { runner.generate().await });

    wait_until(&session, |state| *state == SessionState::Summarizing).await;

    let err = session.generate().await.unwrap_err();
    assert!(matches!(err, Error::Busy));

    session.cancel().await?;
    let result = handle.await?;
    assert!(matches!(result, Err(Error::Cancelled)));

    Ok(())
}

#[tokio::test]
async fn test_cancel_during_summarization_keeps_prior_note() -> Result<()> {
    let (library, persistence, session, item) = rig(true, Arc::new(StallingSummarizer)).await?;

    persistence.save_note(item, "the old note").await?;

    let runner = Arc::clone(&session);
    let handle = tokio::spawn(async move { runner.generate().await });

    wait_until(&session, |state| *state == SessionState::Summarizing).await;

    session.cancel().await?;
    let result = handle.await?;
    assert!(matches!(result, Err(Error::Cancelled)));

    // The note is untouched; the transcript committed before summarization
    // stays.
    assert_eq!(
        library.load_note(item).await?.as_deref(),
        Some("the old note")
    );
    assert_eq!(
        library.load_transcript(item).await?.as_deref(),
        Some("spoken words")
    );
    assert_eq!(session.state().await, SessionState::Stopped);

    Ok(())
}

#[tokio::test]
async fn test_summarization_failure_faults_session_but_keeps_transcript() -> Result<()> {
    let (library, _, session, item) = rig(true, Arc::new(FailingSummarizer)).await?;

    let err = session.generate().await.unwrap_err();
    assert!(matches!(err, Error::Summarization(_)));

    assert!(matches!(
        session.state().await,
        SessionState::Error {
            stage: Stage::Summarizing,
            ..
        }
    ));
    assert_eq!(
        library.load_transcript(item).await?.as_deref(),
        Some("spoken words")
    );
    assert_eq!(library.load_note(item).await?, None);

    // Generate is rejected until the session is reset.
    let err = session.generate().await.unwrap_err();
    assert!(matches!(err, Error::Faulted));

    session.reset().await?;
    assert_eq!(session.state().await, SessionState::Stopped);

    Ok(())
}

#[tokio::test]
async fn test_streamed_text_is_observable_while_summarizing() -> Result<()> {
    let (_, _, session, _) = rig(true, Arc::new(StallingSummarizer)).await?;

    let updates = session.note_updates();

    let runner = Arc::clone(&session);
    let handle = tokio::spawn(async move { runner.generate().await });

    wait_until(&session, |state| *state == SessionState::Summarizing).await;

    // The stalling summarizer emitted one cumulative value before stalling.
    for _ in 0..1000 {
        if !updates.borrow().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(*updates.borrow(), "draft...");

    session.cancel().await?;
    let _ = handle.await?;

    Ok(())
}

// ============================================================================
// Rebinding
// ============================================================================

#[tokio::test]
async fn test_rebind_clears_transient_state() -> Result<()> {
    let (library, _, session, _) = rig(true, Arc::new(DoneSummarizer)).await?;

    session.generate().await?;
    assert!(!session.note_updates().borrow().is_empty());

    let fresh = library.create_item("Fresh", None).await?;
    session.rebind(fresh.id).await?;

    assert_eq!(session.item().await, fresh.id);
    assert_eq!(session.state().await, SessionState::Idle);
    assert!(session.note_updates().borrow().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rebind_to_missing_item_fails() -> Result<()> {
    let (_, _, session, item) = rig(true, Arc::new(DoneSummarizer)).await?;

    let ghost = uuid::Uuid::new_v4();
    let err = session.rebind(ghost).await.unwrap_err();
    assert!(matches!(err, Error::ItemNotFound(_)));

    // Still bound to the original item.
    assert_eq!(session.item().await, item);

    Ok(())
}
