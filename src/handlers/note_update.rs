use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

use super::origin_connection;
use crate::models::{ErrorResponse, Note, NoteFields};
use crate::AppState;

/// Apply an edit to a note. On success the updated note has been persisted
/// and broadcast to the note's room.
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<String>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
    Json(fields): Json<NoteFields>,
) -> Result<Json<Note>, (StatusCode, Json<ErrorResponse>)> {
    let origin = origin_connection(&headers);
    let note = state
        .coordinator
        .submit_edit(&user_id, note_id, fields, origin)
        .await
        .map_err(<(StatusCode, Json<ErrorResponse>)>::from)?;
    Ok(Json(note))
}
