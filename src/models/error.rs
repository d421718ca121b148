use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
    /// Field-level validation detail, present for validation failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: String) -> (StatusCode, Json<ErrorResponse>) {
        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error,
                errors: None,
            }),
        )
    }
}

/// A single malformed field in an edit request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Typed failure returned by the edit coordinator. Terminal in all cases:
/// the coordinator never retries on the caller's behalf.
#[derive(Debug)]
pub enum CoordinatorError {
    /// Requested entity absent
    NotFound(String),
    /// Permission check failed for the acting user
    Forbidden(String),
    /// Malformed edit fields, with per-field detail
    Validation(Vec<FieldError>),
    /// Persistence layer failure; no broadcast was emitted
    Storage(String),
}

impl std::fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorError::NotFound(what) => write!(f, "{}", what),
            CoordinatorError::Forbidden(reason) => write!(f, "{}", reason),
            CoordinatorError::Validation(errors) => {
                let detail = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Validation failed ({})", detail)
            }
            CoordinatorError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for CoordinatorError {}

impl From<CoordinatorError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: CoordinatorError) -> Self {
        let (status, errors) = match &err {
            CoordinatorError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            CoordinatorError::Forbidden(_) => (StatusCode::FORBIDDEN, None),
            CoordinatorError::Validation(detail) => {
                (StatusCode::BAD_REQUEST, Some(detail.clone()))
            }
            CoordinatorError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: err.to_string(),
                errors,
            }),
        )
    }
}

/// Failure verifying a bearer credential; the connection or request is
/// refused, never retried.
#[derive(Debug)]
pub enum AuthError {
    MissingCredential,
    InvalidCredential(String),
    NotConfigured,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "Missing bearer credential"),
            AuthError::InvalidCredential(e) => write!(f, "Invalid credential: {}", e),
            AuthError::NotConfigured => write!(f, "No JWT secret configured"),
        }
    }
}

impl std::error::Error for AuthError {}
