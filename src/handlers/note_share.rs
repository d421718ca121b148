use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

use super::origin_connection;
use crate::models::{ErrorResponse, Note, ShareNoteRequest};
use crate::AppState;

/// Share a note with another user, resolved by email. Owner only.
pub async fn share_note(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<String>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ShareNoteRequest>,
) -> Result<Json<Note>, (StatusCode, Json<ErrorResponse>)> {
    let origin = origin_connection(&headers);
    let note = state
        .coordinator
        .share_note(&user_id, note_id, &payload.email, payload.permission, origin)
        .await
        .map_err(<(StatusCode, Json<ErrorResponse>)>::from)?;
    Ok(Json(note))
}
