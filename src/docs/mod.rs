use utoipa::OpenApi;
use uuid::Uuid;

use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready to accept traffic", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// List notes visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/notes",
    params(
        ("page" = Option<u32>, Query, description = "Page number, 1-based"),
        ("limit" = Option<u32>, Query, description = "Notes per page")
    ),
    responses(
        (status = 200, description = "Page of notes", body = NotePage),
        (status = 401, description = "Missing or invalid credential")
    )
)]
#[allow(dead_code)]
pub async fn list_notes_doc() {}

/// Create a new note
#[utoipa::path(
    post,
    path = "/api/v1/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created successfully", body = Note),
        (status = 400, description = "Validation failed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_note_doc() {}

/// Fetch a single note
#[utoipa::path(
    get,
    path = "/api/v1/notes/{note_id}",
    params(("note_id" = Uuid, Path, description = "Note id")),
    responses(
        (status = 200, description = "The note", body = Note),
        (status = 403, description = "Caller may not read this note", body = ErrorResponse),
        (status = 404, description = "Note not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_note_doc() {}

/// Update a note's title and/or content
#[utoipa::path(
    put,
    path = "/api/v1/notes/{note_id}",
    params(("note_id" = Uuid, Path, description = "Note id")),
    request_body = NoteFields,
    responses(
        (status = 200, description = "Updated note", body = Note),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Caller may not write this note", body = ErrorResponse),
        (status = 404, description = "Note not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn update_note_doc() {}

/// Delete a note permanently
#[utoipa::path(
    delete,
    path = "/api/v1/notes/{note_id}",
    params(("note_id" = Uuid, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note deleted", body = DeleteNoteResponse),
        (status = 403, description = "Only the owner may delete", body = ErrorResponse),
        (status = 404, description = "Note not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn delete_note_doc() {}

/// Share a note with another user by email
#[utoipa::path(
    post,
    path = "/api/v1/notes/{note_id}/share",
    params(("note_id" = Uuid, Path, description = "Note id")),
    request_body = ShareNoteRequest,
    responses(
        (status = 200, description = "Updated note with new collaborator", body = Note),
        (status = 403, description = "Only the owner may share", body = ErrorResponse),
        (status = 404, description = "Note or user not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn share_note_doc() {}

/// Revoke a collaborator's access to a note
#[utoipa::path(
    delete,
    path = "/api/v1/notes/{note_id}/collaborators/{user_id}",
    params(
        ("note_id" = Uuid, Path, description = "Note id"),
        ("user_id" = String, Path, description = "Collaborator user id")
    ),
    responses(
        (status = 200, description = "Updated note", body = Note),
        (status = 403, description = "Only the owner may revoke access", body = ErrorResponse),
        (status = 404, description = "Note or collaborator not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn remove_collaborator_doc() {}

/// Archive a note
#[utoipa::path(
    post,
    path = "/api/v1/notes/{note_id}/archive",
    params(("note_id" = Uuid, Path, description = "Note id")),
    responses(
        (status = 200, description = "Archived note", body = Note),
        (status = 403, description = "Only the owner may archive", body = ErrorResponse),
        (status = 404, description = "Note not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn archive_note_doc() {}

/// Runtime diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Registry and host statistics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        list_notes_doc,
        create_note_doc,
        get_note_doc,
        update_note_doc,
        delete_note_doc,
        share_note_doc,
        remove_collaborator_doc,
        archive_note_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            DiagnosticsResponse,
            ErrorResponse,
            FieldError,
            Note,
            Collaborator,
            Permission,
            NoteFields,
            CreateNoteRequest,
            NotePage,
            ShareNoteRequest,
            DeleteNoteResponse,
        )
    ),
    tags(
        (name = "api", description = "Note synchronization API")
    )
)]
pub struct ApiDoc;
