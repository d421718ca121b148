use super::{ClientMessage, Note, Permission, ServerEvent};

#[test]
fn upsert_collaborator_replaces_permission_instead_of_duplicating() {
    let mut note = Note::new("u1", "Plan".into(), "draft".into());

    note.upsert_collaborator("u2", Permission::Read);
    note.upsert_collaborator("u2", Permission::Write);

    assert_eq!(note.collaborators.len(), 1);
    assert_eq!(note.collaborators[0].user_id, "u2");
    assert_eq!(note.collaborators[0].permission, Permission::Write);
}

#[test]
fn remove_collaborator_reports_presence() {
    let mut note = Note::new("u1", "Plan".into(), "draft".into());
    note.upsert_collaborator("u2", Permission::Read);

    assert!(note.remove_collaborator("u2"));
    assert!(!note.remove_collaborator("u2"));
    assert!(note.collaborators.is_empty());
}

#[test]
fn next_revision_is_strictly_greater_even_without_clock_advance() {
    let mut note = Note::new("u1", "Plan".into(), "draft".into());
    // Push the marker far into the future so wall clock cannot win
    note.revision = i64::MAX - 10;
    assert_eq!(note.next_revision(), i64::MAX - 9);
}

#[test]
fn server_events_serialize_with_snake_case_type_tags() {
    let note = Note::new("u1", "Plan".into(), "draft".into());
    let event = ServerEvent::NoteUpdated(super::NoteUpdatedEvent {
        note: note.clone(),
        updated_by_user_id: "u2".into(),
    });
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(json["type"], "note_updated");
    assert_eq!(json["updatedByUserId"], "u2");
    assert_eq!(json["note"]["owner"], "u1");

    let event = ServerEvent::NoteDeleted(super::NoteDeletedEvent { note_id: note.id });
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(json["type"], "note_deleted");
    assert_eq!(json["noteId"], note.id.to_string());

    let conn_id = uuid::Uuid::new_v4();
    let event = ServerEvent::Connected(super::ConnectedEvent {
        connection_id: conn_id,
    });
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(json["type"], "connected");
    assert_eq!(json["connectionId"], conn_id.to_string());
}

#[test]
fn client_messages_parse_from_tagged_json() {
    let note = Note::new("u1", "Plan".into(), "draft".into());
    let raw = format!(r#"{{"type":"join_note","noteId":"{}"}}"#, note.id);
    match serde_json::from_str::<ClientMessage>(&raw) {
        Ok(ClientMessage::JoinNote(msg)) => assert_eq!(msg.note_id, note.id),
        other => panic!("unexpected parse result: {:?}", other),
    }
}

#[test]
fn permission_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&Permission::Write).expect("serialize"),
        "\"write\""
    );
    assert_eq!(
        serde_json::from_str::<Permission>("\"read\"").expect("parse"),
        Permission::Read
    );
}
