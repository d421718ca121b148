use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Note, Permission};

/// Request body for creating a note
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
}

/// Query parameters for the paginated note listing
#[derive(Deserialize, Debug, ToSchema)]
pub struct ListNotesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// One page of notes visible to a user
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotePage {
    pub notes: Vec<Note>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_notes: u64,
}

/// Request body for sharing a note with another user
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareNoteRequest {
    pub email: String,
    pub permission: Permission,
}

/// Response for a delete
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DeleteNoteResponse {
    pub message: String,
}
