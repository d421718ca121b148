use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Note, Permission};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinNoteMessage {
    pub note_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LeaveNoteMessage {
    pub note_id: Uuid,
}

/// Messages a client sends over its WebSocket connection
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join_note")]
    JoinNote(JoinNoteMessage),
    #[serde(rename = "leave_note")]
    LeaveNote(LeaveNoteMessage),
}

/// Greeting sent once per connection, right after the credential is
/// verified. The client echoes this id in the `x-connection-id` header of
/// its HTTP mutations so the fan-out can skip the originating connection.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    pub connection_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdatedEvent {
    pub note: Note,
    pub updated_by_user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NoteDeletedEvent {
    pub note_id: Uuid,
}

/// Profile of the user a note was shared with
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SharedWith {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub permission: Permission,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NoteSharedEvent {
    pub note_id: Uuid,
    pub shared_with: SharedWith,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorRemovedEvent {
    pub note_id: Uuid,
    pub user_id: String,
}

/// Room-scoped events fanned out to every subscriber of a note
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected(ConnectedEvent),
    #[serde(rename = "note_updated")]
    NoteUpdated(NoteUpdatedEvent),
    #[serde(rename = "note_deleted")]
    NoteDeleted(NoteDeletedEvent),
    #[serde(rename = "note_shared")]
    NoteShared(NoteSharedEvent),
    #[serde(rename = "collaborator_removed")]
    CollaboratorRemoved(CollaboratorRemovedEvent),
}
