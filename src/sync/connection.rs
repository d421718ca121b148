//! Per-connection lifecycle and WebSocket transport glue.
//!
//! A connection is an explicit state machine, `Connecting -> Authenticated ->
//! Disconnected`, driven by discrete inputs: credential verified, join
//! request, leave request, transport close. The handshake credential is
//! checked before the upgrade; a missing or invalid token fails the
//! connection before any join is honored.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::registry::SessionRegistry;
use crate::models::{ClientMessage, ConnectedEvent, ServerEvent};
use crate::services::auth_service;
use crate::utils::scope_guard::ScopeGuard;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authenticated,
    Disconnected,
}

/// Lifecycle state machine for one connection. Registry effects happen on
/// the transitions, so membership always matches the machine's state.
pub struct ConnectionFsm {
    conn_id: Uuid,
    state: ConnectionState,
}

impl ConnectionFsm {
    pub fn new(conn_id: Uuid) -> Self {
        Self {
            conn_id,
            state: ConnectionState::Connecting,
        }
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Credential verified: register the connection and its event channel.
    /// The first frame on the channel is the `connected` greeting carrying
    /// the connection id, which the client echoes in `x-connection-id` so
    /// its own mutations are excluded from the fan-out back to it.
    pub fn credential_verified(
        &mut self,
        registry: &SessionRegistry,
        user_id: &str,
        sender: UnboundedSender<ServerEvent>,
    ) -> bool {
        if self.state != ConnectionState::Connecting {
            warn!("Credential input in state {:?} ignored", self.state);
            return false;
        }
        let _ = sender.send(ServerEvent::Connected(ConnectedEvent {
            connection_id: self.conn_id,
        }));
        registry.register(self.conn_id, user_id, sender);
        self.state = ConnectionState::Authenticated;
        true
    }

    /// Join request. Only honored once authenticated.
    pub fn handle_join(&mut self, registry: &SessionRegistry, note_id: Uuid) -> bool {
        if self.state != ConnectionState::Authenticated {
            warn!("Join for note {} ignored in state {:?}", note_id, self.state);
            return false;
        }
        registry.join(self.conn_id, note_id);
        true
    }

    /// Leave request. Only honored once authenticated.
    pub fn handle_leave(&mut self, registry: &SessionRegistry, note_id: Uuid) -> bool {
        if self.state != ConnectionState::Authenticated {
            return false;
        }
        registry.leave(self.conn_id, note_id);
        true
    }

    /// Transport closed: remove the connection from every room. Idempotent.
    pub fn transport_closed(&mut self, registry: &SessionRegistry) {
        if self.state != ConnectionState::Disconnected {
            registry.drop_connection(self.conn_id);
            self.state = ConnectionState::Disconnected;
        }
    }
}

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
}

// Token from the `token` query parameter or, failing that, the bearer header.
fn handshake_token(query: WsAuthQuery, headers: &HeaderMap) -> Option<String> {
    if let Some(token) = query.token {
        return Some(token);
    }
    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    Some(auth.strip_prefix("Bearer ").unwrap_or(auth).to_string())
}

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsAuthQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let token = match handshake_token(query, &headers) {
        Some(token) => token,
        None => {
            warn!("WebSocket handshake without credential rejected");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let user_id = match auth_service::verify_credential(&token) {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!("WebSocket handshake rejected: {}", e);
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    info!("New WebSocket connection attempt by user {}", user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Apply one inbound frame to the connection's state machine. Control and
/// binary frames are tolerated, not fatal; returns false once the client
/// sent a close frame and the receive loop should end.
pub(super) fn apply_frame(fsm: &mut ConnectionFsm, registry: &SessionRegistry, msg: Message) -> bool {
    let text = match msg {
        Message::Text(text) => text,
        Message::Close(_) => return false,
        Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => return true,
    };

    let parsed: ClientMessage = match serde_json::from_str(&text) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Failed to parse message from {}: {}", fsm.conn_id(), e);
            return true;
        }
    };
    match parsed {
        ClientMessage::JoinNote(join) => {
            fsm.handle_join(registry, join.note_id);
        }
        ClientMessage::LeaveNote(leave) => {
            fsm.handle_leave(registry, leave.note_id);
        }
    }
    true
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: String, state: Arc<AppState>) {
    // Unique connection ID identifying this client in room tables
    let conn_id = Uuid::new_v4();
    info!(
        "WebSocket connection established for user {} with connection_id {}",
        user_id, conn_id
    );

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let mut fsm = ConnectionFsm::new(conn_id);
    fsm.credential_verified(&state.registry, &user_id, event_tx);

    // Membership cleanup must run on every exit path, exactly once from the
    // registry's point of view.
    let registry_guard = state.registry.clone();
    let _cleanup = ScopeGuard::new(move || registry_guard.drop_connection(conn_id));

    let (mut sender, mut receiver) = socket.split();

    // Forward room events from the registry channel to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("Failed to serialize event for {}: {}", conn_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    // Apply join/leave requests from the client
    let registry = state.registry.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if !apply_frame(&mut fsm, &registry, msg) {
                break;
            }
        }
        fsm.transport_closed(&registry);
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut recv_task) => send_task.abort(),
        _ = (&mut send_task) => recv_task.abort(),
    };
    info!("WebSocket connection {} terminated", conn_id);
}
