use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Runtime stats for the synchronization process
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    /// Live WebSocket connections
    pub n_connections: u32,
    /// Rooms with at least one subscriber
    pub n_rooms: u32,
    /// Room memberships summed over all rooms
    pub n_subscriptions: u32,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_free: u64,
    pub memory_total: u64,
}
