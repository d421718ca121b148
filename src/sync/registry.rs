//! Connection and room membership tables.
//!
//! The registry is an explicit object constructed at process start and passed
//! through application state; tests build their own instance. The connection
//! and room tables are the only shared mutable state in the engine, guarded by
//! one mutex so membership changes and publish snapshots are atomic with
//! respect to each other.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::ServerEvent;

struct Connection {
    user_id: String,
    sender: UnboundedSender<ServerEvent>,
    rooms: HashSet<Uuid>,
}

#[derive(Default)]
struct Tables {
    connections: HashMap<Uuid, Connection>,
    /// Room partition keyed by note id; an entry exists only while the room
    /// has at least one member.
    rooms: HashMap<Uuid, HashSet<Uuid>>,
}

/// Registry stats snapshot for diagnostics
pub struct RegistryStats {
    pub n_connections: u32,
    pub n_rooms: u32,
    pub n_subscriptions: u32,
}

#[derive(Default)]
pub struct SessionRegistry {
    tables: Mutex<Tables>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated connection. The user id is fixed for the
    /// connection's lifetime.
    pub fn register(&self, conn_id: Uuid, user_id: &str, sender: UnboundedSender<ServerEvent>) {
        let mut tables = self.tables.lock().expect("registry lock poisoned");
        tables.connections.insert(
            conn_id,
            Connection {
                user_id: user_id.to_string(),
                sender,
                rooms: HashSet::new(),
            },
        );
        debug!("Registered connection {} for user {}", conn_id, user_id);
    }

    /// Add a connection to a note's room. Idempotent; joining a room the
    /// connection is already in, or joining with an unregistered connection,
    /// is a no-op.
    pub fn join(&self, conn_id: Uuid, note_id: Uuid) {
        let mut tables = self.tables.lock().expect("registry lock poisoned");
        match tables.connections.get_mut(&conn_id) {
            Some(conn) => {
                conn.rooms.insert(note_id);
            }
            None => {
                warn!("Join for unregistered connection {}", conn_id);
                return;
            }
        }
        tables.rooms.entry(note_id).or_default().insert(conn_id);
    }

    /// Remove a connection from a note's room. Idempotent.
    pub fn leave(&self, conn_id: Uuid, note_id: Uuid) {
        let mut tables = self.tables.lock().expect("registry lock poisoned");
        if let Some(conn) = tables.connections.get_mut(&conn_id) {
            conn.rooms.remove(&note_id);
        }
        if let Some(members) = tables.rooms.get_mut(&note_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                tables.rooms.remove(&note_id);
            }
        }
    }

    /// Remove a connection from every room it joined and forget it. Called on
    /// transport disconnect; safe to call for a connection that was never
    /// registered or joined nothing.
    pub fn drop_connection(&self, conn_id: Uuid) {
        let mut tables = self.tables.lock().expect("registry lock poisoned");
        let rooms = match tables.connections.remove(&conn_id) {
            Some(conn) => conn.rooms,
            None => return,
        };
        for note_id in rooms {
            if let Some(members) = tables.rooms.get_mut(&note_id) {
                members.remove(&conn_id);
                if members.is_empty() {
                    tables.rooms.remove(&note_id);
                }
            }
        }
        debug!("Dropped connection {}", conn_id);
    }

    /// Deliver an event to every member of a note's room except, when given,
    /// the excluded connection.
    ///
    /// Sends happen under the table lock, so per room the delivery order on
    /// every connection's channel matches the publish call order. Sends are
    /// fire-and-forget: a member whose receiver is gone is skipped and never
    /// aborts delivery to the rest.
    pub fn publish(&self, note_id: Uuid, event: &ServerEvent, exclude: Option<Uuid>) -> usize {
        let tables = self.tables.lock().expect("registry lock poisoned");
        let members = match tables.rooms.get(&note_id) {
            Some(members) => members,
            None => return 0,
        };

        let mut delivered = 0;
        for conn_id in members {
            if Some(*conn_id) == exclude {
                continue;
            }
            if let Some(conn) = tables.connections.get(conn_id) {
                if conn.sender.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// User id a connection authenticated as, if it is registered.
    pub fn user_of(&self, conn_id: Uuid) -> Option<String> {
        let tables = self.tables.lock().expect("registry lock poisoned");
        tables.connections.get(&conn_id).map(|c| c.user_id.clone())
    }

    pub fn is_member(&self, conn_id: Uuid, note_id: Uuid) -> bool {
        let tables = self.tables.lock().expect("registry lock poisoned");
        tables
            .rooms
            .get(&note_id)
            .map_or(false, |members| members.contains(&conn_id))
    }

    pub fn stats(&self) -> RegistryStats {
        let tables = self.tables.lock().expect("registry lock poisoned");
        RegistryStats {
            n_connections: tables.connections.len() as u32,
            n_rooms: tables.rooms.len() as u32,
            n_subscriptions: tables.rooms.values().map(|m| m.len() as u32).sum(),
        }
    }
}
