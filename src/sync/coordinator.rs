//! Edit coordinator: validates permission, applies the change to the store,
//! stamps the revision marker, and fans the result out to the note's room.
//!
//! Writes against one note are serialized through a per-note mutex held
//! across load-modify-persist-publish, so two racing edits resolve to a
//! strict last-write-wins: the persist that completes last is the value
//! every room member subsequently receives. A storage failure emits no
//! broadcast; a broadcast always implies a persisted write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info};
use uuid::Uuid;

use super::broadcaster::RoomBroadcaster;
use crate::clients::UserDirectory;
use crate::models::{
    CollaboratorRemovedEvent, CoordinatorError, CreateNoteRequest, FieldError, Note,
    NoteDeletedEvent, NoteFields, NotePage, NoteSharedEvent, NoteUpdatedEvent, Permission,
    ServerEvent, SharedWith,
};
use crate::permissions;
use crate::store::NoteStore;

const DEFAULT_PAGE_LIMIT: u32 = 10;

pub struct EditCoordinator {
    store: Arc<dyn NoteStore>,
    broadcaster: RoomBroadcaster,
    users: Arc<dyn UserDirectory>,
    /// Per-note write serialization for load-modify-persist
    write_locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl EditCoordinator {
    pub fn new(
        store: Arc<dyn NoteStore>,
        broadcaster: RoomBroadcaster,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            store,
            broadcaster,
            users,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    fn write_lock(&self, note_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.write_locks.lock().expect("write lock table poisoned");
        locks.entry(note_id).or_default().clone()
    }

    fn forget_write_lock(&self, note_id: Uuid) {
        let mut locks = self.write_locks.lock().expect("write lock table poisoned");
        locks.remove(&note_id);
    }

    async fn load(&self, note_id: Uuid) -> Result<Note, CoordinatorError> {
        match self.store.get(note_id).await {
            Ok(Some(note)) => Ok(note),
            Ok(None) => Err(CoordinatorError::NotFound("Note not found".to_string())),
            Err(e) => Err(CoordinatorError::Storage(e.to_string())),
        }
    }

    async fn persist(&self, note: &Note) -> Result<(), CoordinatorError> {
        self.store
            .put(note)
            .await
            .map_err(|e| CoordinatorError::Storage(e.to_string()))
    }

    fn ensure_owner(&self, note: &Note, user_id: &str, action: &str) -> Result<(), CoordinatorError> {
        if note.owner != user_id {
            return Err(CoordinatorError::Forbidden(format!(
                "Not authorized to {} this note",
                action
            )));
        }
        Ok(())
    }

    /// Create a note owned by `user_id`.
    pub async fn create_note(
        &self,
        user_id: &str,
        request: CreateNoteRequest,
    ) -> Result<Note, CoordinatorError> {
        let title = request.title.trim();
        let content = request.content.trim();

        let mut errors = Vec::new();
        if title.is_empty() {
            errors.push(FieldError::new("title", "Title is required"));
        }
        if content.is_empty() {
            errors.push(FieldError::new("content", "Content is required"));
        }
        if !errors.is_empty() {
            return Err(CoordinatorError::Validation(errors));
        }

        let note = Note::new(user_id, title.to_string(), content.to_string());
        self.persist(&note).await?;
        info!("Note {} created by {}", note.id, user_id);
        Ok(note)
    }

    /// Fetch one note, enforcing read permission.
    pub async fn get_note(&self, user_id: &str, note_id: Uuid) -> Result<Note, CoordinatorError> {
        let note = self.load(note_id).await?;
        if !permissions::can_read(&note, user_id) {
            return Err(CoordinatorError::Forbidden(
                "Not authorized to view this note".to_string(),
            ));
        }
        Ok(note)
    }

    /// Paginated listing of unarchived notes the user owns or collaborates on.
    pub async fn list_notes(
        &self,
        user_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<NotePage, CoordinatorError> {
        self.store
            .list_for_user(
                user_id,
                page.unwrap_or(1),
                limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            )
            .await
            .map_err(|e| CoordinatorError::Storage(e.to_string()))
    }

    /// Apply an edit to a note and fan out `note_updated` to its room,
    /// excluding the originating connection when known.
    pub async fn submit_edit(
        &self,
        user_id: &str,
        note_id: Uuid,
        fields: NoteFields,
        origin: Option<Uuid>,
    ) -> Result<Note, CoordinatorError> {
        let lock = self.write_lock(note_id);
        let _guard = lock.lock().await;

        let mut note = self.load(note_id).await?;
        if !permissions::can_write(&note, user_id) {
            return Err(CoordinatorError::Forbidden(
                "Not authorized to update this note".to_string(),
            ));
        }
        let fields = validate_fields(fields)?;

        if let Some(title) = fields.title {
            note.title = title;
        }
        if let Some(content) = fields.content {
            note.content = content;
        }
        note.last_modified_by = Some(user_id.to_string());
        note.revision = note.next_revision();
        note.updated_at = chrono::Utc::now();

        self.persist(&note).await?;

        self.broadcaster.publish(
            note_id,
            &ServerEvent::NoteUpdated(NoteUpdatedEvent {
                note: note.clone(),
                updated_by_user_id: user_id.to_string(),
            }),
            origin,
        );
        Ok(note)
    }

    /// Share a note with another user, resolved by email. Owner only.
    /// Re-sharing an existing collaborator replaces their permission level.
    pub async fn share_note(
        &self,
        user_id: &str,
        note_id: Uuid,
        email: &str,
        permission: Permission,
        origin: Option<Uuid>,
    ) -> Result<Note, CoordinatorError> {
        let lock = self.write_lock(note_id);
        let _guard = lock.lock().await;

        let mut note = self.load(note_id).await?;
        self.ensure_owner(&note, user_id, "share")?;

        // Only the verified owner triggers an outbound lookup
        let target = match self.users.find_by_email(email).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                return Err(CoordinatorError::NotFound("User not found".to_string()));
            }
            Err(e) => {
                error!("User lookup failed for '{}': {}", email, e);
                return Err(CoordinatorError::Storage(e));
            }
        };

        // The owner is never listed as a collaborator
        if target.user_id == note.owner {
            return Err(CoordinatorError::Validation(vec![FieldError::new(
                "email",
                "Cannot share a note with its owner",
            )]));
        }

        note.upsert_collaborator(&target.user_id, permission);
        note.revision = note.next_revision();
        note.updated_at = chrono::Utc::now();
        self.persist(&note).await?;

        self.broadcaster.publish(
            note_id,
            &ServerEvent::NoteShared(NoteSharedEvent {
                note_id,
                shared_with: SharedWith {
                    user_id: target.user_id,
                    name: target.name,
                    email: target.email,
                    permission,
                },
            }),
            origin,
        );
        Ok(note)
    }

    /// Remove a collaborator entry. Owner only.
    pub async fn remove_collaborator(
        &self,
        user_id: &str,
        note_id: Uuid,
        target_user_id: &str,
        origin: Option<Uuid>,
    ) -> Result<Note, CoordinatorError> {
        let lock = self.write_lock(note_id);
        let _guard = lock.lock().await;

        let mut note = self.load(note_id).await?;
        self.ensure_owner(&note, user_id, "modify collaborators on")?;

        note.remove_collaborator(target_user_id);
        note.revision = note.next_revision();
        note.updated_at = chrono::Utc::now();
        self.persist(&note).await?;

        self.broadcaster.publish(
            note_id,
            &ServerEvent::CollaboratorRemoved(CollaboratorRemovedEvent {
                note_id,
                user_id: target_user_id.to_string(),
            }),
            origin,
        );
        Ok(note)
    }

    /// Hard-delete a note. Owner only. The deletion is persisted before the
    /// broadcast, so a racing edit that observes the event reliably fails
    /// with not-found.
    pub async fn delete_note(
        &self,
        user_id: &str,
        note_id: Uuid,
        origin: Option<Uuid>,
    ) -> Result<(), CoordinatorError> {
        let lock = self.write_lock(note_id);
        {
            let _guard = lock.lock().await;

            let note = self.load(note_id).await?;
            self.ensure_owner(&note, user_id, "delete")?;

            self.store
                .delete(note_id)
                .await
                .map_err(|e| CoordinatorError::Storage(e.to_string()))?;

            self.broadcaster.publish(
                note_id,
                &ServerEvent::NoteDeleted(NoteDeletedEvent { note_id }),
                origin,
            );
        }
        self.forget_write_lock(note_id);
        info!("Note {} deleted by {}", note_id, user_id);
        Ok(())
    }

    /// Soft-delete: the note drops out of listings but stays in the store.
    /// Room members are told the note is gone the same way as a hard delete.
    pub async fn archive_note(
        &self,
        user_id: &str,
        note_id: Uuid,
        origin: Option<Uuid>,
    ) -> Result<Note, CoordinatorError> {
        let lock = self.write_lock(note_id);
        let _guard = lock.lock().await;

        let mut note = self.load(note_id).await?;
        self.ensure_owner(&note, user_id, "archive")?;

        note.archived = true;
        note.revision = note.next_revision();
        note.updated_at = chrono::Utc::now();
        self.persist(&note).await?;

        self.broadcaster.publish(
            note_id,
            &ServerEvent::NoteDeleted(NoteDeletedEvent { note_id }),
            origin,
        );
        Ok(note)
    }
}

/// Present fields must be non-empty once trimmed; absent fields leave the
/// stored value unchanged.
fn validate_fields(fields: NoteFields) -> Result<NoteFields, CoordinatorError> {
    let mut errors = Vec::new();

    let title = match fields.title {
        Some(t) => {
            let t = t.trim().to_string();
            if t.is_empty() {
                errors.push(FieldError::new("title", "Title cannot be empty"));
            }
            Some(t)
        }
        None => None,
    };
    let content = match fields.content {
        Some(c) => {
            let c = c.trim().to_string();
            if c.is_empty() {
                errors.push(FieldError::new("content", "Content cannot be empty"));
            }
            Some(c)
        }
        None => None,
    };

    if !errors.is_empty() {
        return Err(CoordinatorError::Validation(errors));
    }
    Ok(NoteFields { title, content })
}
