use axum::routing::{delete, get, post};
use axum::{middleware, Router};
use std::sync::Arc;

use crate::handlers::{
    archive_note, create_note, delete_note, diagnostics, get_note, health_check, list_notes,
    ready_check, remove_collaborator, share_note, update_note,
};
use crate::routes::auth_middleware::auth_middleware;
use crate::AppState;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/v1/notes", post(create_note).get(list_notes))
        .route(
            "/v1/notes/:note_id",
            get(get_note).put(update_note).delete(delete_note),
        )
        .route("/v1/notes/:note_id/share", post(share_note))
        .route("/v1/notes/:note_id/archive", post(archive_note))
        .route(
            "/v1/notes/:note_id/collaborators/:user_id",
            delete(remove_collaborator),
        )
        .route("/v1/diagnostics", get(diagnostics))
        .route_layer(middleware::from_fn(auth_middleware)) // Applies to all routes added above
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .with_state(state)
}
