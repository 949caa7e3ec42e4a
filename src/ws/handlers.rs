//! WebSocket message dispatch
//!
//! Resolves the session's identity, then hands the message to the lobby or
//! game handler module. Failures become an `error` message for the
//! originating session only.

use crate::error::{GameError, GameResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::SessionContext;
use crate::state::AppState;
use std::sync::Arc;

use super::{game, lobby};

/// The (room, player) a session is bound to, or an error if it has not joined yet
pub(crate) fn require_binding(ctx: &SessionContext) -> GameResult<(&str, &str)> {
    ctx.binding()
        .ok_or_else(|| GameError::InvalidState("Join a room first".to_string()))
}

/// Handle a client message and return an optional private reply
pub async fn handle_message(
    msg: ClientMessage,
    session_id: &str,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    let ctx = state.sessions.context(session_id).await;

    let result = match msg {
        ClientMessage::CreateRoom { username } => {
            lobby::handle_create_room(state, session_id, username).await
        }

        ClientMessage::JoinRoom { room_id, username } => {
            lobby::handle_join_room(state, session_id, room_id, username).await
        }

        ClientMessage::Reconnect { room_id, player_id } => {
            lobby::handle_reconnect(state, session_id, room_id, player_id).await
        }

        ClientMessage::ChangeTeam { team, role } => {
            lobby::handle_change_team(state, &ctx, team, role).await
        }

        ClientMessage::UpdateSettings {
            word_pack,
            timer_seconds,
        } => lobby::handle_update_settings(state, &ctx, word_pack, timer_seconds).await,

        ClientMessage::StartGame { starting_team } => {
            game::handle_start_game(state, &ctx, starting_team).await
        }

        ClientMessage::SubmitClue { word, number } => {
            game::handle_submit_clue(state, &ctx, word, number).await
        }

        ClientMessage::MakeGuess { card_index } => {
            game::handle_make_guess(state, &ctx, card_index).await
        }

        ClientMessage::EndTurn => game::handle_end_turn(state, &ctx).await,
    };

    match result {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Rejected request from session {}: {}", session_id, e);
            Some(e.payload().into())
        }
    }
}

/// Transport-level disconnect of a session
pub async fn handle_disconnect(session_id: &str, state: &Arc<AppState>) {
    state.gateway.disconnect(session_id).await;

    let Some(binding) = state.sessions.session_closed(session_id).await else {
        // Not bound yet; an in-flight join will find the mark
        return;
    };

    match state
        .mark_player_disconnected(&binding.room_id, &binding.player_id)
        .await
    {
        Ok(room) => state.publish_all(&room).await,
        Err(e) => tracing::debug!(
            "Disconnect of {} for a room that is gone: {}",
            binding.player_id,
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, Team};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    async fn connect(state: &AppState, session_id: &str) -> UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        state.gateway.connect(session_id, tx).await;
        rx
    }

    fn joined(reply: Option<ServerMessage>) -> (String, String) {
        match reply {
            Some(ServerMessage::Joined { player_id, room }) => (room.id, player_id),
            other => panic!("expected joined, got {:?}", other),
        }
    }

    fn error_kind(reply: Option<ServerMessage>) -> String {
        match reply {
            Some(ServerMessage::Error { kind, .. }) => kind,
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_room_binds_session() {
        let state = Arc::new(AppState::default());
        let mut rx = connect(&state, "s1").await;

        let reply = handle_message(
            ClientMessage::CreateRoom {
                username: "Alice".to_string(),
            },
            "s1",
            &state,
        )
        .await;
        let (room_id, player_id) = joined(reply);

        let ctx = state.sessions.context("s1").await;
        assert_eq!(ctx.binding(), Some((room_id.as_str(), player_id.as_str())));
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::RoomUpdate { .. })));
    }

    #[tokio::test]
    async fn test_actions_require_joined_session() {
        let state = Arc::new(AppState::default());

        let reply = handle_message(
            ClientMessage::ChangeTeam {
                team: Some(Team::Red),
                role: Role::Operative,
            },
            "s1",
            &state,
        )
        .await;
        assert_eq!(error_kind(reply), "InvalidState");

        let reply = handle_message(ClientMessage::EndTurn, "s1", &state).await;
        assert_eq!(error_kind(reply), "InvalidState");
    }

    #[tokio::test]
    async fn test_join_missing_room_reports_error() {
        let state = Arc::new(AppState::default());
        let reply = handle_message(
            ClientMessage::JoinRoom {
                room_id: "ZZZZZ-ZZZZZ".to_string(),
                username: "Bob".to_string(),
            },
            "s1",
            &state,
        )
        .await;
        assert_eq!(error_kind(reply), "RoomNotFound");

        // A failed join leaves nothing in flight
        assert!(state.sessions.begin_join("s1", "Bob").await);
    }

    #[tokio::test]
    async fn test_disconnect_before_join_leaves_player_disconnected() {
        let state = Arc::new(AppState::default());
        let room = state.create_room("Alice").await.unwrap();
        let _rx = connect(&state, "s2").await;

        // Transport closes before the join request is processed
        handle_disconnect("s2", &state).await;

        let reply = handle_message(
            ClientMessage::JoinRoom {
                room_id: room.id.clone(),
                username: "Bob".to_string(),
            },
            "s2",
            &state,
        )
        .await;
        assert!(reply.is_none());

        let room = state.get_room(&room.id).await.unwrap();
        let bob = room.players.iter().find(|p| p.username == "Bob").unwrap();
        assert!(!bob.connected);
        assert!(state.sessions.session_for_player(&bob.id).await.is_none());
        assert_eq!(state.sessions.context("s2").await.binding(), None);
    }

    #[tokio::test]
    async fn test_disconnect_after_join_marks_player() {
        let state = Arc::new(AppState::default());
        let _rx = connect(&state, "s1").await;
        let (room_id, player_id) = joined(
            handle_message(
                ClientMessage::CreateRoom {
                    username: "Alice".to_string(),
                },
                "s1",
                &state,
            )
            .await,
        );

        handle_disconnect("s1", &state).await;

        let room = state.get_room(&room_id).await.unwrap();
        assert!(!room.player(&player_id).unwrap().connected);
        assert_eq!(state.gateway.subscriber_count(&room_id).await, 0);
        assert!(state.sessions.consume_disconnected_session("s1").await);
    }

    #[tokio::test]
    async fn test_every_join_pending_on_closed_session_stays_disconnected() {
        let state = Arc::new(AppState::default());
        let room = state.create_room("Alice").await.unwrap();
        let _rx = connect(&state, "s2").await;

        handle_disconnect("s2", &state).await;

        for username in ["Bob", "Carl"] {
            let reply = handle_message(
                ClientMessage::JoinRoom {
                    room_id: room.id.clone(),
                    username: username.to_string(),
                },
                "s2",
                &state,
            )
            .await;
            assert!(reply.is_none());
        }

        let room = state.get_room(&room.id).await.unwrap();
        for username in ["Bob", "Carl"] {
            let player = room.players.iter().find(|p| p.username == username).unwrap();
            assert!(!player.connected, "{} left connected", username);
            assert!(state.sessions.session_for_player(&player.id).await.is_none());
        }
        assert_eq!(state.sessions.context("s2").await.binding(), None);
        assert_eq!(state.gateway.subscriber_count(&room.id).await, 0);
    }

    #[tokio::test]
    async fn test_join_then_reconnect_on_closed_session_stays_disconnected() {
        let state = Arc::new(AppState::default());
        let room = state.create_room("Alice").await.unwrap();
        let alice = room.admin_id.clone();
        state.mark_player_disconnected(&room.id, &alice).await.unwrap();
        let _rx = connect(&state, "s2").await;

        handle_disconnect("s2", &state).await;

        let reply = handle_message(
            ClientMessage::JoinRoom {
                room_id: room.id.clone(),
                username: "Bob".to_string(),
            },
            "s2",
            &state,
        )
        .await;
        assert!(reply.is_none());

        let reply = handle_message(
            ClientMessage::Reconnect {
                room_id: room.id.clone(),
                player_id: alice.clone(),
            },
            "s2",
            &state,
        )
        .await;
        assert!(reply.is_none());

        let room = state.get_room(&room.id).await.unwrap();
        assert!(room.players.iter().all(|p| !p.connected));
        assert!(state.sessions.session_for_player(&alice).await.is_none());
        assert_eq!(state.sessions.context("s2").await.binding(), None);
    }

    #[tokio::test]
    async fn test_reconnect_restores_player() {
        let state = Arc::new(AppState::default());
        let _rx1 = connect(&state, "s1").await;
        let (room_id, player_id) = joined(
            handle_message(
                ClientMessage::CreateRoom {
                    username: "Alice".to_string(),
                },
                "s1",
                &state,
            )
            .await,
        );
        handle_disconnect("s1", &state).await;

        let _rx2 = connect(&state, "s2").await;
        let reply = handle_message(
            ClientMessage::Reconnect {
                room_id: room_id.to_lowercase(),
                player_id: player_id.clone(),
            },
            "s2",
            &state,
        )
        .await;
        let (_, resumed) = joined(reply);
        assert_eq!(resumed, player_id);

        let room = state.get_room(&room_id).await.unwrap();
        assert!(room.player(&player_id).unwrap().connected);
        assert_eq!(room.players.len(), 1);
    }

    #[tokio::test]
    async fn test_switching_identity_disconnects_previous_player() {
        let state = Arc::new(AppState::default());
        let _rx = connect(&state, "s1").await;
        let (room_id, alice) = joined(
            handle_message(
                ClientMessage::CreateRoom {
                    username: "Alice".to_string(),
                },
                "s1",
                &state,
            )
            .await,
        );

        let (_, bob) = joined(
            handle_message(
                ClientMessage::JoinRoom {
                    room_id: room_id.clone(),
                    username: "Bob".to_string(),
                },
                "s1",
                &state,
            )
            .await,
        );

        let room = state.get_room(&room_id).await.unwrap();
        assert!(!room.player(&alice).unwrap().connected);
        assert!(room.player(&bob).unwrap().connected);
    }
}
