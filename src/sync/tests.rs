use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::Message;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use uuid::Uuid;

use super::connection::apply_frame;
use super::{ConnectionFsm, ConnectionState, EditCoordinator, RoomBroadcaster, SessionRegistry};
use crate::clients::{UserDirectory, UserProfile};
use crate::models::{
    CoordinatorError, CreateNoteRequest, Note, NoteFields, Permission, ServerEvent,
};
use crate::store::memory::MemoryNoteStore;
use crate::store::{NoteStore, StoreError};

/// Directory with a fixed set of users, keyed by email.
struct StaticDirectory(Vec<UserProfile>);

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, String> {
        Ok(self.0.iter().find(|p| p.email == email).cloned())
    }
}

fn directory() -> Arc<dyn UserDirectory> {
    Arc::new(StaticDirectory(vec![
        UserProfile {
            user_id: "u1".into(),
            name: "Uma".into(),
            email: "u1@example.com".into(),
        },
        UserProfile {
            user_id: "u2".into(),
            name: "Vik".into(),
            email: "u2@example.com".into(),
        },
    ]))
}

struct Harness {
    registry: Arc<SessionRegistry>,
    store: Arc<MemoryNoteStore>,
    coordinator: EditCoordinator,
}

fn harness() -> Harness {
    let registry = Arc::new(SessionRegistry::new());
    let store = Arc::new(MemoryNoteStore::new());
    let coordinator = EditCoordinator::new(
        store.clone(),
        RoomBroadcaster::new(registry.clone()),
        directory(),
    );
    Harness {
        registry,
        store,
        coordinator,
    }
}

impl Harness {
    /// Register a connection for `user_id` and join it to the note's room.
    fn subscribe(&self, user_id: &str, note_id: Uuid) -> (Uuid, UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.register(conn_id, user_id, tx);
        self.registry.join(conn_id, note_id);
        (conn_id, rx)
    }

    async fn seed_note(&self, owner: &str) -> Note {
        self.coordinator
            .create_note(
                owner,
                CreateNoteRequest {
                    title: "Plan".into(),
                    content: "draft".into(),
                },
            )
            .await
            .expect("create note")
    }
}

fn assert_empty(rx: &mut UnboundedReceiver<ServerEvent>) {
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

// ---- registry -------------------------------------------------------------

#[tokio::test]
async fn join_is_idempotent() {
    let h = harness();
    let note_id = Uuid::new_v4();
    let (conn, mut rx) = h.subscribe("u1", note_id);
    h.registry.join(conn, note_id);
    h.registry.join(conn, note_id);

    let stats = h.registry.stats();
    assert_eq!(stats.n_rooms, 1);
    assert_eq!(stats.n_subscriptions, 1);

    // One join means one delivery
    let event = ServerEvent::NoteDeleted(crate::models::NoteDeletedEvent { note_id });
    assert_eq!(h.registry.publish(note_id, &event, None), 1);
    assert!(rx.try_recv().is_ok());
    assert_empty(&mut rx);
}

#[tokio::test]
async fn leave_is_idempotent_and_empties_rooms() {
    let h = harness();
    let note_id = Uuid::new_v4();
    let (conn, mut rx) = h.subscribe("u1", note_id);

    h.registry.leave(conn, note_id);
    h.registry.leave(conn, note_id);
    assert_eq!(h.registry.stats().n_rooms, 0);

    let event = ServerEvent::NoteDeleted(crate::models::NoteDeletedEvent { note_id });
    assert_eq!(h.registry.publish(note_id, &event, None), 0);
    assert_empty(&mut rx);
}

#[tokio::test]
async fn drop_connection_clears_every_room_and_tolerates_unknown_ids() {
    let h = harness();
    let note_a = Uuid::new_v4();
    let note_b = Uuid::new_v4();
    let (conn, _rx) = h.subscribe("u1", note_a);
    h.registry.join(conn, note_b);
    assert_eq!(h.registry.stats().n_subscriptions, 2);

    h.registry.drop_connection(conn);
    let stats = h.registry.stats();
    assert_eq!(stats.n_connections, 0);
    assert_eq!(stats.n_rooms, 0);

    // Never joined, never registered: still fine
    h.registry.drop_connection(conn);
    h.registry.drop_connection(Uuid::new_v4());
}

#[tokio::test]
async fn publish_excludes_the_originating_connection() {
    let h = harness();
    let note_id = Uuid::new_v4();
    let (origin, mut origin_rx) = h.subscribe("u1", note_id);
    let (_other, mut other_rx) = h.subscribe("u2", note_id);

    let event = ServerEvent::NoteDeleted(crate::models::NoteDeletedEvent { note_id });
    assert_eq!(h.registry.publish(note_id, &event, Some(origin)), 1);
    assert_empty(&mut origin_rx);
    assert!(other_rx.try_recv().is_ok());
}

#[tokio::test]
async fn publish_order_is_fifo_per_room() {
    let h = harness();
    let note_id = Uuid::new_v4();
    let (_conn, mut rx) = h.subscribe("u1", note_id);

    for user in ["a", "b", "c"] {
        let event = ServerEvent::CollaboratorRemoved(crate::models::CollaboratorRemovedEvent {
            note_id,
            user_id: user.into(),
        });
        h.registry.publish(note_id, &event, None);
    }

    for expected in ["a", "b", "c"] {
        match rx.try_recv().expect("event") {
            ServerEvent::CollaboratorRemoved(e) => assert_eq!(e.user_id, expected),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

// ---- connection state machine ---------------------------------------------

#[tokio::test]
async fn joins_are_ignored_until_the_credential_is_verified() {
    let h = harness();
    let note_id = Uuid::new_v4();
    let mut fsm = ConnectionFsm::new(Uuid::new_v4());
    assert_eq!(fsm.state(), ConnectionState::Connecting);

    assert!(!fsm.handle_join(&h.registry, note_id));
    assert_eq!(h.registry.stats().n_rooms, 0);

    let (tx, _rx) = mpsc::unbounded_channel();
    assert!(fsm.credential_verified(&h.registry, "u1", tx));
    assert_eq!(fsm.state(), ConnectionState::Authenticated);
    assert!(fsm.handle_join(&h.registry, note_id));
    assert!(h.registry.is_member(fsm.conn_id(), note_id));
}

#[tokio::test]
async fn transport_close_is_a_single_terminal_transition() {
    let h = harness();
    let note_id = Uuid::new_v4();
    let mut fsm = ConnectionFsm::new(Uuid::new_v4());
    let (tx, _rx) = mpsc::unbounded_channel();
    fsm.credential_verified(&h.registry, "u1", tx);
    fsm.handle_join(&h.registry, note_id);

    fsm.transport_closed(&h.registry);
    assert_eq!(fsm.state(), ConnectionState::Disconnected);
    assert_eq!(h.registry.stats().n_connections, 0);

    // Further inputs are no-ops
    fsm.transport_closed(&h.registry);
    assert!(!fsm.handle_join(&h.registry, note_id));
    let (tx2, _rx2) = mpsc::unbounded_channel();
    assert!(!fsm.credential_verified(&h.registry, "u1", tx2));
}

#[tokio::test]
async fn greeting_announces_the_id_the_fanout_excludes() {
    let h = harness();
    let note_id = Uuid::new_v4();
    let mut fsm = ConnectionFsm::new(Uuid::new_v4());
    let (tx, mut rx) = mpsc::unbounded_channel();
    fsm.credential_verified(&h.registry, "u1", tx);

    // The first frame names this connection's id
    let conn_id = match rx.try_recv().expect("greeting frame") {
        ServerEvent::Connected(e) => e.connection_id,
        other => panic!("unexpected event: {:?}", other),
    };
    assert_eq!(conn_id, fsm.conn_id());

    // Echoing that id back as the origin suppresses the fan-out to us
    fsm.handle_join(&h.registry, note_id);
    let event = ServerEvent::NoteDeleted(crate::models::NoteDeletedEvent { note_id });
    assert_eq!(h.registry.publish(note_id, &event, Some(conn_id)), 0);
    assert_empty(&mut rx);
}

#[tokio::test]
async fn control_frames_do_not_end_the_receive_loop() {
    let h = harness();
    let note_id = Uuid::new_v4();
    let mut fsm = ConnectionFsm::new(Uuid::new_v4());
    let (tx, mut rx) = mpsc::unbounded_channel();
    fsm.credential_verified(&h.registry, "u1", tx);
    rx.try_recv().expect("greeting frame");

    let join = format!(r#"{{"type":"join_note","noteId":"{}"}}"#, note_id);
    assert!(apply_frame(&mut fsm, &h.registry, Message::Text(join)));
    assert!(h.registry.is_member(fsm.conn_id(), note_id));

    // Ping/pong, binary, and unparseable text are tolerated
    assert!(apply_frame(&mut fsm, &h.registry, Message::Ping(Vec::new())));
    assert!(apply_frame(&mut fsm, &h.registry, Message::Pong(Vec::new())));
    assert!(apply_frame(&mut fsm, &h.registry, Message::Binary(vec![1, 2])));
    assert!(apply_frame(
        &mut fsm,
        &h.registry,
        Message::Text("not json".to_string())
    ));
    assert!(h.registry.is_member(fsm.conn_id(), note_id));

    // Only a close frame ends the loop
    assert!(!apply_frame(&mut fsm, &h.registry, Message::Close(None)));
}

// ---- edit coordinator -----------------------------------------------------

#[tokio::test]
async fn write_collaborator_edit_reaches_the_owners_session() {
    let h = harness();
    let note = h.seed_note("u1").await;
    h.coordinator
        .share_note("u1", note.id, "u2@example.com", Permission::Write, None)
        .await
        .expect("share");

    let (_owner_conn, mut owner_rx) = h.subscribe("u1", note.id);
    let (editor_conn, mut editor_rx) = h.subscribe("u2", note.id);

    let updated = h
        .coordinator
        .submit_edit(
            "u2",
            note.id,
            NoteFields {
                title: None,
                content: Some("revised".into()),
            },
            Some(editor_conn),
        )
        .await
        .expect("edit");
    assert_eq!(updated.content, "revised");
    assert_eq!(updated.last_modified_by.as_deref(), Some("u2"));

    match owner_rx.try_recv().expect("owner event") {
        ServerEvent::NoteUpdated(e) => {
            assert_eq!(e.updated_by_user_id, "u2");
            assert_eq!(e.note.content, "revised");
        }
        other => panic!("unexpected event: {:?}", other),
    }
    // The originating connection is excluded from the fan-out
    assert_empty(&mut editor_rx);
}

#[tokio::test]
async fn stranger_edit_is_forbidden_and_emits_nothing() {
    let h = harness();
    let note = h.seed_note("u1").await;
    let (_conn, mut rx) = h.subscribe("u1", note.id);

    let result = h
        .coordinator
        .submit_edit(
            "u3",
            note.id,
            NoteFields {
                title: None,
                content: Some("sneaky".into()),
            },
            None,
        )
        .await;
    assert!(matches!(result, Err(CoordinatorError::Forbidden(_))));
    assert_empty(&mut rx);

    let stored = h.store.get(note.id).await.expect("get").expect("present");
    assert_eq!(stored.content, "draft");
}

#[tokio::test]
async fn read_collaborator_cannot_publish_edits() {
    let h = harness();
    let note = h.seed_note("u1").await;
    h.coordinator
        .share_note("u1", note.id, "u2@example.com", Permission::Read, None)
        .await
        .expect("share");

    let result = h
        .coordinator
        .submit_edit(
            "u2",
            note.id,
            NoteFields {
                title: None,
                content: Some("nope".into()),
            },
            None,
        )
        .await;
    assert!(matches!(result, Err(CoordinatorError::Forbidden(_))));
}

#[tokio::test]
async fn empty_fields_are_rejected_with_field_detail() {
    let h = harness();
    let note = h.seed_note("u1").await;

    let result = h
        .coordinator
        .submit_edit(
            "u1",
            note.id,
            NoteFields {
                title: Some("  ".into()),
                content: Some("".into()),
            },
            None,
        )
        .await;
    match result {
        Err(CoordinatorError::Validation(errors)) => {
            assert_eq!(errors.len(), 2);
            assert_eq!(errors[0].field, "title");
            assert_eq!(errors[1].field, "content");
        }
        other => panic!("unexpected result: {:?}", other.map(|n| n.id)),
    }
}

#[tokio::test]
async fn accepted_revisions_are_strictly_increasing() {
    let h = harness();
    let note = h.seed_note("u1").await;

    let mut last = note.revision;
    for i in 0..5 {
        let updated = h
            .coordinator
            .submit_edit(
                "u1",
                note.id,
                NoteFields {
                    title: None,
                    content: Some(format!("v{}", i)),
                },
                None,
            )
            .await
            .expect("edit");
        assert!(updated.revision > last, "revision must strictly increase");
        last = updated.revision;
    }
}

/// Store whose writes fail after a given number of successes.
struct FlakyStore {
    inner: MemoryNoteStore,
    allowed_puts: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl NoteStore for FlakyStore {
    async fn get(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        self.inner.get(id).await
    }

    async fn put(&self, note: &Note) -> Result<(), StoreError> {
        use std::sync::atomic::Ordering;
        if self.allowed_puts.fetch_sub(1, Ordering::SeqCst) == 0 {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.put(note).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<crate::models::NotePage, StoreError> {
        self.inner.list_for_user(user_id, page, limit).await
    }
}

#[tokio::test]
async fn storage_failure_surfaces_and_suppresses_the_broadcast() {
    let registry = Arc::new(SessionRegistry::new());
    let store = Arc::new(FlakyStore {
        inner: MemoryNoteStore::new(),
        // One successful put for the seed write, then failure
        allowed_puts: std::sync::atomic::AtomicUsize::new(1),
    });
    let coordinator = EditCoordinator::new(
        store.clone(),
        RoomBroadcaster::new(registry.clone()),
        directory(),
    );

    let note = coordinator
        .create_note(
            "u1",
            CreateNoteRequest {
                title: "Plan".into(),
                content: "draft".into(),
            },
        )
        .await
        .expect("seed");

    let conn_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.register(conn_id, "u1", tx);
    registry.join(conn_id, note.id);

    let result = coordinator
        .submit_edit(
            "u1",
            note.id,
            NoteFields {
                title: None,
                content: Some("lost".into()),
            },
            None,
        )
        .await;
    assert!(matches!(result, Err(CoordinatorError::Storage(_))));
    assert_empty(&mut rx);

    // The persisted state is untouched
    let stored = store.get(note.id).await.expect("get").expect("present");
    assert_eq!(stored.content, "draft");
}

#[tokio::test]
async fn concurrent_edits_resolve_to_a_single_winner() {
    let h = harness();
    let note = h.seed_note("u1").await;
    h.coordinator
        .share_note("u1", note.id, "u2@example.com", Permission::Write, None)
        .await
        .expect("share");

    let (_watcher, mut rx) = h.subscribe("watcher", note.id);

    let coordinator = &h.coordinator;
    let a = coordinator.submit_edit(
        "u1",
        note.id,
        NoteFields {
            title: None,
            content: Some("A".into()),
        },
        None,
    );
    let b = coordinator.submit_edit(
        "u2",
        note.id,
        NoteFields {
            title: None,
            content: Some("B".into()),
        },
        None,
    );
    let (ra, rb) = tokio::join!(a, b);
    // Both submitters get a normal success response
    let ra = ra.expect("edit A");
    let rb = rb.expect("edit B");

    let stored = h.store.get(note.id).await.expect("get").expect("present");
    assert!(stored.content == "A" || stored.content == "B");

    // The later revision is the persisted one, and the last broadcast
    // matches the persisted state.
    let winner = if ra.revision > rb.revision { ra } else { rb };
    assert_eq!(stored.content, winner.content);
    assert_eq!(stored.revision, winner.revision);

    let mut last_broadcast = None;
    while let Ok(event) = rx.try_recv() {
        if let ServerEvent::NoteUpdated(e) = event {
            last_broadcast = Some(e);
        }
    }
    let last_broadcast = last_broadcast.expect("at least one update event");
    assert_eq!(last_broadcast.note.content, stored.content);
    assert_eq!(last_broadcast.note.revision, stored.revision);
}

#[tokio::test]
async fn delete_broadcasts_then_subsequent_edits_fail_not_found() {
    let h = harness();
    let note = h.seed_note("u1").await;
    let (_conn, mut rx) = h.subscribe("u2", note.id);

    h.coordinator
        .delete_note("u1", note.id, None)
        .await
        .expect("delete");

    match rx.try_recv().expect("event") {
        ServerEvent::NoteDeleted(e) => assert_eq!(e.note_id, note.id),
        other => panic!("unexpected event: {:?}", other),
    }

    let result = h
        .coordinator
        .submit_edit(
            "u1",
            note.id,
            NoteFields {
                title: None,
                content: Some("late".into()),
            },
            None,
        )
        .await;
    assert!(matches!(result, Err(CoordinatorError::NotFound(_))));
}

#[tokio::test]
async fn only_the_owner_may_delete() {
    let h = harness();
    let note = h.seed_note("u1").await;
    h.coordinator
        .share_note("u1", note.id, "u2@example.com", Permission::Write, None)
        .await
        .expect("share");

    let result = h.coordinator.delete_note("u2", note.id, None).await;
    assert!(matches!(result, Err(CoordinatorError::Forbidden(_))));
    assert!(h.store.get(note.id).await.expect("get").is_some());
}

#[tokio::test]
async fn sharing_twice_replaces_the_permission_level() {
    let h = harness();
    let note = h.seed_note("u1").await;
    let (_conn, mut rx) = h.subscribe("u1", note.id);

    h.coordinator
        .share_note("u1", note.id, "u2@example.com", Permission::Read, None)
        .await
        .expect("share read");
    let updated = h
        .coordinator
        .share_note("u1", note.id, "u2@example.com", Permission::Write, None)
        .await
        .expect("share write");

    assert_eq!(updated.collaborators.len(), 1);
    assert_eq!(updated.collaborators[0].permission, Permission::Write);

    match rx.try_recv().expect("first share event") {
        ServerEvent::NoteShared(e) => {
            assert_eq!(e.shared_with.user_id, "u2");
            assert_eq!(e.shared_with.name, "Vik");
            assert_eq!(e.shared_with.permission, Permission::Read);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

/// Directory that counts lookups before delegating.
struct CountingDirectory {
    inner: Arc<dyn UserDirectory>,
    lookups: AtomicUsize,
}

#[async_trait]
impl UserDirectory for CountingDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_email(email).await
    }
}

#[tokio::test]
async fn share_checks_ownership_before_resolving_the_target() {
    let registry = Arc::new(SessionRegistry::new());
    let store = Arc::new(MemoryNoteStore::new());
    let users = Arc::new(CountingDirectory {
        inner: directory(),
        lookups: AtomicUsize::new(0),
    });
    let coordinator = EditCoordinator::new(
        store.clone(),
        RoomBroadcaster::new(registry),
        users.clone(),
    );

    let note = coordinator
        .create_note(
            "u1",
            CreateNoteRequest {
                title: "Plan".into(),
                content: "draft".into(),
            },
        )
        .await
        .expect("seed");

    // A non-owner's share attempt must not reach the directory
    let result = coordinator
        .share_note("u2", note.id, "u1@example.com", Permission::Write, None)
        .await;
    assert!(matches!(result, Err(CoordinatorError::Forbidden(_))));
    assert_eq!(users.lookups.load(Ordering::SeqCst), 0);

    coordinator
        .share_note("u1", note.id, "u2@example.com", Permission::Write, None)
        .await
        .expect("share");
    assert_eq!(users.lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sharing_with_the_owner_or_unknown_email_fails() {
    let h = harness();
    let note = h.seed_note("u1").await;

    let result = h
        .coordinator
        .share_note("u1", note.id, "u1@example.com", Permission::Write, None)
        .await;
    assert!(matches!(result, Err(CoordinatorError::Validation(_))));

    let result = h
        .coordinator
        .share_note("u1", note.id, "nobody@example.com", Permission::Read, None)
        .await;
    assert!(matches!(result, Err(CoordinatorError::NotFound(_))));

    // Non-owners cannot share, even with write permission
    h.coordinator
        .share_note("u1", note.id, "u2@example.com", Permission::Write, None)
        .await
        .expect("share");
    let result = h
        .coordinator
        .share_note("u2", note.id, "u2@example.com", Permission::Write, None)
        .await;
    assert!(matches!(result, Err(CoordinatorError::Forbidden(_))));
}

#[tokio::test]
async fn removing_a_collaborator_revokes_access_and_broadcasts() {
    let h = harness();
    let note = h.seed_note("u1").await;
    h.coordinator
        .share_note("u1", note.id, "u2@example.com", Permission::Write, None)
        .await
        .expect("share");
    let (_conn, mut rx) = h.subscribe("u2", note.id);

    h.coordinator
        .remove_collaborator("u1", note.id, "u2", None)
        .await
        .expect("remove");

    match rx.try_recv().expect("event") {
        ServerEvent::CollaboratorRemoved(e) => {
            assert_eq!(e.note_id, note.id);
            assert_eq!(e.user_id, "u2");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let result = h.coordinator.get_note("u2", note.id).await;
    assert!(matches!(result, Err(CoordinatorError::Forbidden(_))));
}

#[tokio::test]
async fn archiving_hides_the_note_and_notifies_the_room() {
    let h = harness();
    let note = h.seed_note("u1").await;
    let (_conn, mut rx) = h.subscribe("u2", note.id);

    h.coordinator
        .archive_note("u1", note.id, None)
        .await
        .expect("archive");

    match rx.try_recv().expect("event") {
        ServerEvent::NoteDeleted(e) => assert_eq!(e.note_id, note.id),
        other => panic!("unexpected event: {:?}", other),
    }

    let page = h
        .coordinator
        .list_notes("u1", None, None)
        .await
        .expect("list");
    assert!(page.notes.iter().all(|n| n.id != note.id));
}
