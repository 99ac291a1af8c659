use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Library: folders
        .route(
            "/folders",
            get(handlers::list_folders).post(handlers::create_folder),
        )
        .route("/folders/:folder_id", delete(handlers::delete_folder))
        .route("/folders/:folder_id/rename", post(handlers::rename_folder))
        .route("/folders/:folder_id/items", get(handlers::list_items))
        // Library: items
        .route("/items", post(handlers::create_item))
        .route(
            "/items/:item_id",
            get(handlers::get_item).delete(handlers::delete_item),
        )
        .route("/items/:item_id/rename", post(handlers::rename_item))
        .route("/items/:item_id/move", post(handlers::move_item))
        .route("/items/:item_id/audio", post(handlers::import_audio))
        // Recording control
        .route(
            "/items/:item_id/record/start",
            post(handlers::start_recording),
        )
        .route(
            "/items/:item_id/record/stop",
            post(handlers::stop_recording),
        )
        // Pipeline
        .route("/items/:item_id/generate", post(handlers::generate_notes))
        .route("/items/:item_id/cancel", post(handlers::cancel_pipeline))
        .route("/items/:item_id/reset", post(handlers::reset_session))
        .route("/items/:item_id/status", get(handlers::session_status))
        .route("/items/:item_id/transcript", get(handlers::get_transcript))
        .route("/items/:item_id/note", get(handlers::get_note))
        .route("/items/:item_id/note/stream", get(handlers::streamed_note))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
