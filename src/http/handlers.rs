use super::state::AppState;
use crate::error::Error;
use crate::session::SessionState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    /// Destination folder; omitted means "first folder, auto-creating the
    /// default one if the library is empty"
    pub folder_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MoveItemRequest {
    pub from: Uuid,
    pub to: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    /// Display name for the imported blob
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map a taxonomy error onto an HTTP response.
fn error_response(e: Error) -> Response {
    let status = match &e {
        Error::FolderNotFound(_) | Error::ItemNotFound(_) => StatusCode::NOT_FOUND,
        Error::Busy | Error::AlreadyActive | Error::Faulted => StatusCode::CONFLICT,
        Error::Decode(_) | Error::EmptyAudio | Error::MissingAudio => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::Permission(_) => StatusCode::FORBIDDEN,
        Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        Error::Network { .. } | Error::Service { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Library handlers
// ============================================================================

/// POST /folders
pub async fn create_folder(
    State(state): State<AppState>,
    Json(req): Json<CreateFolderRequest>,
) -> Response {
    match state.library.create_folder(&req.name).await {
        Ok(folder) => (StatusCode::OK, Json(folder)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /folders
pub async fn list_folders(State(state): State<AppState>) -> Response {
    match state.library.list_folders().await {
        Ok(folders) => (StatusCode::OK, Json(folders)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /folders/:folder_id/rename
pub async fn rename_folder(
    State(state): State<AppState>,
    Path(folder_id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Response {
    match state.library.rename_folder(folder_id, &req.name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /folders/:folder_id
/// Cascades to every item the folder owns.
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(folder_id): Path<Uuid>,
) -> Response {
    // Sessions bound to the folder's items are stale after the cascade.
    let doomed: Vec<Uuid> = match state.library.list_items(folder_id).await {
        Ok(items) => items.into_iter().map(|item| item.id).collect(),
        Err(e) => return error_response(e),
    };

    match state.library.delete_folder(folder_id).await {
        Ok(()) => {
            for item in doomed {
                state.forget_session(item).await;
            }
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /folders/:folder_id/items
pub async fn list_items(State(state): State<AppState>, Path(folder_id): Path<Uuid>) -> Response {
    match state.library.list_items(folder_id).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /items
pub async fn create_item(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> Response {
    match state.library.create_item(&req.name, req.folder_id).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /items/:item_id
pub async fn get_item(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    match state.library.get_item(item_id).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /items/:item_id/rename
pub async fn rename_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Response {
    match state.library.rename_item(item_id, &req.name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /items/:item_id/move
pub async fn move_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(req): Json<MoveItemRequest>,
) -> Response {
    match state.library.move_item(item_id, req.from, req.to).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /items/:item_id
/// Cascades to the item's audio, transcript, and note.
pub async fn delete_item(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    let item = match state.library.get_item(item_id).await {
        Ok(item) => item,
        Err(e) => return error_response(e),
    };

    let Some(folder_id) = item.folder_id else {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "item is not in a folder".to_string(),
            }),
        )
            .into_response();
    };

    match state.library.delete_item(item_id, folder_id).await {
        Ok(()) => {
            state.forget_session(item_id).await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /items/:item_id/audio
/// Import an external audio blob; validated decodable before acceptance.
pub async fn import_audio(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Response {
    let name = query.name.unwrap_or_else(|| "imported-audio".to_string());

    let session = match state.session_for(item_id).await {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    match session.import(&name, &body).await {
        Ok(()) => {
            info!("Imported {} bytes into item {}", body.len(), item_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Session handlers
// ============================================================================

/// POST /items/:item_id/record/start
pub async fn start_recording(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    let session = match state.session_for(item_id).await {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    match session.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                status: "recording".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /items/:item_id/record/stop
pub async fn stop_recording(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    let session = match state.session_for(item_id).await {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    match session.stop().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                status: "stopped".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /items/:item_id/generate
/// Kick off the recording-to-notes pipeline in the background. Progress is
/// observable through the status and streamed-note endpoints.
pub async fn generate_notes(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    let session = match state.session_for(item_id).await {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    match session.state().await {
        SessionState::Stopped => {}
        SessionState::Idle => return error_response(Error::MissingAudio),
        SessionState::Error { .. } => return error_response(Error::Faulted),
        _ => return error_response(Error::Busy),
    }

    tokio::spawn(async move {
        if let Err(e) = session.generate().await {
            error!("Pipeline failed for item {}: {}", item_id, e);
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(StatusResponse {
            status: "generating".to_string(),
        }),
    )
        .into_response()
}

/// POST /items/:item_id/cancel
pub async fn cancel_pipeline(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    let session = match state.session_for(item_id).await {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    match session.cancel().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /items/:item_id/reset
pub async fn reset_session(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    let session = match state.session_for(item_id).await {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    match session.reset().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /items/:item_id/status
pub async fn session_status(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    let session = match state.session_for(item_id).await {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    (StatusCode::OK, Json(session.status().await)).into_response()
}

/// GET /items/:item_id/transcript
pub async fn get_transcript(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    match state.library.load_transcript(item_id).await {
        Ok(Some(text)) => (StatusCode::OK, Json(TextResponse { text })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "item has no transcript".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /items/:item_id/note
pub async fn get_note(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    match state.library.load_note(item_id).await {
        Ok(Some(text)) => (StatusCode::OK, Json(TextResponse { text })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "item has no note".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /items/:item_id/note/stream
/// Snapshot of the note text streamed so far by a running summarization.
pub async fn streamed_note(State(state): State<AppState>, Path(item_id): Path<Uuid>) -> Response {
    let session = match state.session_for(item_id).await {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };

    let text = session.note_updates().borrow().clone();
    (StatusCode::OK, Json(TextResponse { text })).into_response()
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
