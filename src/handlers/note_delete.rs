use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

use super::origin_connection;
use crate::models::{DeleteNoteResponse, ErrorResponse};
use crate::AppState;

/// Hard-delete a note. Owner only; the room is told before the response.
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<String>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<DeleteNoteResponse>, (StatusCode, Json<ErrorResponse>)> {
    let origin = origin_connection(&headers);
    state
        .coordinator
        .delete_note(&user_id, note_id, origin)
        .await
        .map_err(<(StatusCode, Json<ErrorResponse>)>::from)?;
    Ok(Json(DeleteNoteResponse {
        message: "Note deleted successfully".to_string(),
    }))
}
