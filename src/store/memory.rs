//! In-memory note store. Default backend when no database URL is configured,
//! and the backend the engine tests run against.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NoteStore, StoreError};
use crate::models::{Note, NotePage};
use crate::permissions;

#[derive(Default)]
pub struct MemoryNoteStore {
    notes: RwLock<HashMap<Uuid, Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn get(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        let notes = self.notes.read().await;
        Ok(notes.get(&id).cloned())
    }

    async fn put(&self, note: &Note) -> Result<(), StoreError> {
        let mut notes = self.notes.write().await;
        notes.insert(note.id, note.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut notes = self.notes.write().await;
        Ok(notes.remove(&id).is_some())
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<NotePage, StoreError> {
        let notes = self.notes.read().await;
        let mut visible: Vec<Note> = notes
            .values()
            .filter(|n| !n.archived && permissions::can_read(n, user_id))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.revision.cmp(&a.revision));

        let total_notes = visible.len() as u64;
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = ((total_notes + limit as u64 - 1) / limit as u64) as u32;
        let start = ((page - 1) * limit) as usize;
        let notes = visible
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect();

        Ok(NotePage {
            notes,
            current_page: page,
            total_pages,
            total_notes,
        })
    }
}
