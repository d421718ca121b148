use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use std::sync::Arc;
use uuid::Uuid;

use super::origin_connection;
use crate::models::{ErrorResponse, Note};
use crate::AppState;

/// Remove a collaborator from a note. Owner only.
pub async fn remove_collaborator(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<String>,
    Path((note_id, collaborator_id)): Path<(Uuid, String)>,
    headers: HeaderMap,
) -> Result<Json<Note>, (StatusCode, Json<ErrorResponse>)> {
    let origin = origin_connection(&headers);
    let note = state
        .coordinator
        .remove_collaborator(&user_id, note_id, &collaborator_id, origin)
        .await
        .map_err(<(StatusCode, Json<ErrorResponse>)>::from)?;
    Ok(Json(note))
}
