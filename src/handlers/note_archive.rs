use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

use super::origin_connection;
use crate::models::{ErrorResponse, Note};
use crate::AppState;

/// Soft-delete a note: it disappears from listings but stays in the store.
pub async fn archive_note(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<String>,
    Path(note_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Note>, (StatusCode, Json<ErrorResponse>)> {
    let origin = origin_connection(&headers);
    let note = state
        .coordinator
        .archive_note(&user_id, note_id, origin)
        .await
        .map_err(<(StatusCode, Json<ErrorResponse>)>::from)?;
    Ok(Json(note))
}
