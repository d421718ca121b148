use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use crate::models::{CreateNoteRequest, ErrorResponse, Note};
use crate::AppState;

/// Create a new note owned by the authenticated user
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), (StatusCode, Json<ErrorResponse>)> {
    let note = state
        .coordinator
        .create_note(&user_id, payload)
        .await
        .map_err(<(StatusCode, Json<ErrorResponse>)>::from)?;

    info!("Note {} created via API by {}", note.id, user_id);
    Ok((StatusCode::CREATED, Json(note)))
}
