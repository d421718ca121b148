use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Access level a collaborator holds on a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
}

/// A (user, permission) entry on a note's collaborator list.
/// At most one entry exists per user id; re-sharing replaces the level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub user_id: String,
    pub permission: Permission,
}

/// A shared note as persisted by the note store
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    /// User id of the owner; the owner is never listed as a collaborator
    pub owner: String,
    pub collaborators: Vec<Collaborator>,
    /// Monotonic revision marker stamped on every accepted write (epoch millis)
    pub revision: i64,
    pub last_modified_by: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Create a new note owned by `owner`, stamped at the current wall clock.
    pub fn new(owner: &str, title: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            owner: owner.to_string(),
            collaborators: Vec::new(),
            revision: now.timestamp_millis(),
            last_modified_by: None,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn collaborator(&self, user_id: &str) -> Option<&Collaborator> {
        self.collaborators.iter().find(|c| c.user_id == user_id)
    }

    /// Add a collaborator or, when an entry for the user already exists,
    /// replace its permission level. The uniqueness invariant holds either way.
    pub fn upsert_collaborator(&mut self, user_id: &str, permission: Permission) {
        match self.collaborators.iter_mut().find(|c| c.user_id == user_id) {
            Some(existing) => existing.permission = permission,
            None => self.collaborators.push(Collaborator {
                user_id: user_id.to_string(),
                permission,
            }),
        }
    }

    /// Remove a collaborator entry. Returns whether an entry was present.
    pub fn remove_collaborator(&mut self, user_id: &str) -> bool {
        let before = self.collaborators.len();
        self.collaborators.retain(|c| c.user_id != user_id);
        self.collaborators.len() != before
    }

    /// Next revision marker for a write accepted against this note.
    /// Wall-clock millis, bumped by one when the clock has not advanced so the
    /// marker stays strictly increasing.
    pub fn next_revision(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        now.max(self.revision + 1)
    }
}

/// Partial edit submitted against a note. Absent fields leave the stored
/// value unchanged; present fields must be non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteFields {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NoteFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}
