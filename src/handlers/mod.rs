pub mod diagnostics;
pub mod health;
pub mod note_archive;
pub mod note_collaborator;
pub mod note_create;
pub mod note_delete;
pub mod note_get;
pub mod note_list;
pub mod note_share;
pub mod note_update;

pub use diagnostics::*;
pub use health::*;
pub use note_archive::*;
pub use note_collaborator::*;
pub use note_create::*;
pub use note_delete::*;
pub use note_get::*;
pub use note_list::*;
pub use note_share::*;
pub use note_update::*;

use axum::http::HeaderMap;
use uuid::Uuid;

/// Originating connection id, when the client tags its HTTP mutation with the
/// WebSocket connection it holds. Lets the coordinator exclude that
/// connection from the resulting fan-out.
pub fn origin_connection(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get("x-connection-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
}
