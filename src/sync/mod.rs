//! The collaborative synchronization engine: session registry, room
//! broadcaster, edit coordinator, and the per-connection state machine.

pub mod broadcaster;
pub mod connection;
pub mod coordinator;
pub mod registry;

pub use broadcaster::RoomBroadcaster;
pub use connection::{websocket_handler, ConnectionFsm, ConnectionState};
pub use coordinator::EditCoordinator;
pub use registry::SessionRegistry;

#[cfg(test)]
mod tests;
