//! Client-side reconciliation of a note editor against room broadcasts.
//!
//! The reconciler owns the local draft: keystrokes land in it immediately and
//! restart a debounce deadline, so only the state at the moment the deadline
//! fires is submitted and intermediate states are coalesced. Incoming
//! `note_updated` events overwrite the draft only when they are genuinely
//! newer and not an echo of this client's own edit.

use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::{Note, NoteFields, NoteUpdatedEvent};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// The editable fields as the user currently sees them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
}

impl Draft {
    fn of(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
        }
    }
}

/// Outcome of applying a broadcast to the local state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteUpdate {
    /// Draft overwritten; surface a notification naming the modifying user
    Applied { updated_by: String },
    /// Event concerns a different note
    OtherNote,
    /// Our own just-submitted edit came back; the local draft stays authoritative
    SelfEcho,
    /// Revision not newer than what we already have
    Stale,
}

pub struct NoteReconciler {
    user_id: String,
    note_id: Uuid,
    local_draft: Draft,
    /// Last state acknowledged by the server, used to decide whether a
    /// debounced flush actually has something to send
    last_synced: Draft,
    last_known_revision: i64,
    pending_save: bool,
    deadline: Option<Instant>,
    debounce: Duration,
}

impl NoteReconciler {
    pub fn new(user_id: &str, note: &Note) -> Self {
        Self {
            user_id: user_id.to_string(),
            note_id: note.id,
            local_draft: Draft::of(note),
            last_synced: Draft::of(note),
            last_known_revision: note.revision,
            pending_save: false,
            deadline: None,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn local_draft(&self) -> &Draft {
        &self.local_draft
    }

    pub fn last_known_revision(&self) -> i64 {
        self.last_known_revision
    }

    pub fn pending_save(&self) -> bool {
        self.pending_save
    }

    /// Deadline of the pending debounced save, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn set_title(&mut self, title: &str) {
        self.local_draft.title = title.to_string();
        self.restart_debounce();
    }

    pub fn set_content(&mut self, content: &str) {
        self.local_draft.content = content.to_string();
        self.restart_debounce();
    }

    // Restarted, never stacked: a keystroke supersedes the pending deadline.
    fn restart_debounce(&mut self) {
        self.pending_save = true;
        self.deadline = Some(Instant::now() + self.debounce);
    }

    /// When the debounce deadline has passed, return the coalesced patch to
    /// submit. Fields equal to the last server-acknowledged state are
    /// omitted; a draft identical to it yields nothing at all.
    pub fn poll_due(&mut self, now: Instant) -> Option<NoteFields> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        self.pending_save = false;

        let fields = NoteFields {
            title: (self.local_draft.title != self.last_synced.title)
                .then(|| self.local_draft.title.clone()),
            content: (self.local_draft.content != self.last_synced.content)
                .then(|| self.local_draft.content.clone()),
        };
        if fields.is_empty() {
            None
        } else {
            Some(fields)
        }
    }

    /// The server accepted our edit: remember its state and revision. The
    /// local draft is untouched; it may already contain newer keystrokes.
    pub fn submit_succeeded(&mut self, note: &Note) {
        self.last_synced = Draft::of(note);
        self.last_known_revision = note.revision;
    }

    /// The submit failed. The draft is preserved, not reverted, and the
    /// debounce is re-armed so the user's state is retried rather than lost.
    pub fn submit_failed(&mut self) {
        self.restart_debounce();
    }

    /// Apply a `note_updated` broadcast.
    pub fn on_note_updated(&mut self, event: &NoteUpdatedEvent) -> RemoteUpdate {
        if event.note.id != self.note_id {
            return RemoteUpdate::OtherNote;
        }
        // Echo suppression: our own edit coming back must not clobber
        // keystrokes typed since submitting it.
        if event.updated_by_user_id == self.user_id {
            return RemoteUpdate::SelfEcho;
        }
        if event.note.revision <= self.last_known_revision {
            return RemoteUpdate::Stale;
        }

        self.local_draft = Draft::of(&event.note);
        self.last_synced = Draft::of(&event.note);
        self.last_known_revision = event.note.revision;
        RemoteUpdate::Applied {
            updated_by: event.updated_by_user_id.clone(),
        }
    }

    /// Full state re-fetched after (re)joining the room. Events missed while
    /// away are reconciled here, not replayed.
    pub fn resync(&mut self, note: &Note) {
        self.local_draft = Draft::of(note);
        self.last_synced = Draft::of(note);
        self.last_known_revision = note.revision;
        self.pending_save = false;
        self.deadline = None;
    }
}
