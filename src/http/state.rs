use crate::audio::MemoryCapture;
use crate::error::Result;
use crate::services::{SpeechToText, Summarizer};
use crate::session::{RecordingSession, SessionConfig};
use crate::store::{Library, PersistenceCoordinator, Store};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub library: Library,
    pub persistence: PersistenceCoordinator,
    pub stt: Arc<dyn SpeechToText>,
    pub summarizer: Arc<dyn Summarizer>,
    pub session_config: SessionConfig,

    /// Active sessions (item id → session)
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<RecordingSession>>>>,
}

impl AppState {
    pub fn new(
        store: Store,
        stt: Arc<dyn SpeechToText>,
        summarizer: Arc<dyn Summarizer>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            library: Library::new(store.clone()),
            persistence: PersistenceCoordinator::new(store),
            stt,
            summarizer,
            session_config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the session owning an item, creating one on first use.
    ///
    /// Service deployments drive items through file import, so sessions are
    /// wired to the in-memory capture device; real capture devices live with
    /// the front-end process.
    pub async fn session_for(&self, item: Uuid) -> Result<Arc<RecordingSession>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(&item) {
                return Ok(Arc::clone(session));
            }
        }

        let session = Arc::new(
            RecordingSession::new(
                item,
                Box::new(MemoryCapture::default()),
                Arc::clone(&self.stt),
                Arc::clone(&self.summarizer),
                self.library.clone(),
                self.persistence.clone(),
                self.session_config.clone(),
            )
            .await?,
        );

        let mut sessions = self.sessions.write().await;
        Ok(Arc::clone(sessions.entry(item).or_insert(session)))
    }

    /// Drop the session for a deleted item, if any.
    pub async fn forget_session(&self, item: Uuid) {
        self.sessions.write().await.remove(&item);
    }
}
