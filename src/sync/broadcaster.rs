use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::registry::SessionRegistry;
use crate::models::ServerEvent;

/// Fan-out handle over the session registry, handed to the edit coordinator.
/// Keeps room bookkeeping and event delivery in one place each.
#[derive(Clone)]
pub struct RoomBroadcaster {
    registry: Arc<SessionRegistry>,
}

impl RoomBroadcaster {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `event` to every subscriber of the note's room, skipping the
    /// originating connection when known. Best-effort: subscribers that are
    /// gone mid-fan-out simply miss the event.
    pub fn publish(&self, note_id: Uuid, event: &ServerEvent, exclude: Option<Uuid>) {
        let delivered = self.registry.publish(note_id, event, exclude);
        debug!(
            "Published event to {} subscriber(s) of note {}",
            delivered, note_id
        );
    }
}
