use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{ErrorResponse, Note};
use crate::AppState;

/// Fetch a single note, read permission enforced
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<String>,
    Path(note_id): Path<Uuid>,
) -> Result<Json<Note>, (StatusCode, Json<ErrorResponse>)> {
    let note = state
        .coordinator
        .get_note(&user_id, note_id)
        .await
        .map_err(<(StatusCode, Json<ErrorResponse>)>::from)?;
    Ok(Json(note))
}
