//! HTTP API server for external front-ends
//!
//! This module provides a REST API over the library and the recording
//! pipeline:
//! - /folders, /items - library CRUD (create, rename, move, delete)
//! - POST /items/:id/audio - import an audio blob
//! - POST /items/:id/record/start|stop - capture control
//! - POST /items/:id/generate - run the recording-to-notes pipeline
//! - GET /items/:id/status, /transcript, /note, /note/stream - observation
//! - GET /health - health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
