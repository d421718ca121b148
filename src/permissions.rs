//! Permission oracle shared by the HTTP handlers and the edit coordinator,
//! so the two can never diverge on who may see or change a note.

use crate::models::{Note, Permission};

/// True when `user_id` owns the note or appears on its collaborator list
/// with any permission level.
pub fn can_read(note: &Note, user_id: &str) -> bool {
    note.owner == user_id || note.collaborator(user_id).is_some()
}

/// True when `user_id` owns the note or collaborates with write permission.
pub fn can_write(note: &Note, user_id: &str) -> bool {
    note.owner == user_id
        || note
            .collaborator(user_id)
            .map_or(false, |c| c.permission == Permission::Write)
}
