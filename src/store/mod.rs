pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Note, NotePage};

/// Failure in the persistence layer. Surfaced to the submitting caller;
/// a write that fails here emits no broadcast.
#[derive(Debug)]
pub enum StoreError {
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Backend(e) => write!(f, "Store backend error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Authoritative persisted note state. The synchronization engine reads and
/// writes whole notes through this interface and does not own the storage
/// format.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Note>, StoreError>;

    /// Insert or fully replace a note.
    async fn put(&self, note: &Note) -> Result<(), StoreError>;

    /// Hard-delete a note. Returns whether it existed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Unarchived notes the user owns or collaborates on, newest write first.
    /// `page` is 1-based.
    async fn list_for_user(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<NotePage, StoreError>;
}
