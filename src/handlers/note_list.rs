use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;

use crate::models::{ErrorResponse, ListNotesQuery, NotePage};
use crate::AppState;

/// Paginated listing of the notes the user owns or collaborates on
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<String>,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<NotePage>, (StatusCode, Json<ErrorResponse>)> {
    let page = state
        .coordinator
        .list_notes(&user_id, query.page, query.limit)
        .await
        .map_err(<(StatusCode, Json<ErrorResponse>)>::from)?;
    Ok(Json(page))
}
