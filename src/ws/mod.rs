pub mod game;
pub mod handlers;
pub mod lobby;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

pub const PROTOCOL_VERSION: &str = "1.0";

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let session_id = ulid::Ulid::new().to_string();

    tracing::info!("WebSocket connected: session {}", session_id);

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        session_id: session_id.clone(),
    };
    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    // Everything addressed to this session (broadcasts and private replies) arrives here
    let (tx, mut outbound) = mpsc::unbounded_channel();
    state.gateway.connect(&session_id, tx).await;

    let (inbound, _worker) = spawn_session_worker(state.clone(), session_id.clone());

    loop {
        tokio::select! {
            out_msg = outbound.recv() => {
                let Some(msg) = out_msg else { break };
                if let Ok(json) = serde_json::to_string(&msg) {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message from {}: {}", session_id, text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                // The worker outlives `inbound`, so this cannot fail
                                let _ = inbound.send(client_msg);
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                let error = GameError::InvalidRequest(format!(
                                    "Invalid message format: {}",
                                    e
                                ));
                                state.send_error(&session_id, &error).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed by client");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Requests still queued run after this and see the session as closed
    drop(inbound);
    handlers::handle_disconnect(&session_id, &state).await;
    tracing::info!("WebSocket connection closed: session {}", session_id);
}

/// Per-session request worker.
///
/// Requests from one session are handled one at a time in arrival order, off
/// the socket task. Different sessions, and the disconnect notification, still
/// run concurrently with it.
pub fn spawn_session_worker(
    state: Arc<AppState>,
    session_id: String,
) -> (mpsc::UnboundedSender<ClientMessage>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientMessage>();
    let handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Some(response) = handlers::handle_message(msg, &session_id, &state).await {
                state.gateway.send_to_session(&session_id, response).await;
            }
        }
    });
    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, Team};

    #[tokio::test]
    async fn test_session_requests_run_in_arrival_order() {
        let state = Arc::new(AppState::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.gateway.connect("s1", tx).await;

        let (inbound, worker) = spawn_session_worker(state.clone(), "s1".to_string());
        inbound
            .send(ClientMessage::CreateRoom {
                username: "Alice".to_string(),
            })
            .unwrap();
        inbound
            .send(ClientMessage::ChangeTeam {
                team: Some(Team::Red),
                role: Role::Spymaster,
            })
            .unwrap();
        drop(inbound);
        worker.await.unwrap();

        let mut errors = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::Error { kind, .. } = msg {
                errors.push(kind);
            }
        }
        assert!(errors.is_empty(), "{:?}", errors);

        let ctx = state.sessions.context("s1").await;
        let (room_id, player_id) = ctx.binding().unwrap();
        let room = state.get_room(room_id).await.unwrap();
        let alice = room.player(player_id).unwrap();
        assert_eq!(alice.team, Some(Team::Red));
        assert_eq!(alice.role, Role::Spymaster);
    }
}
