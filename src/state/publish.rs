//! Pushing room and game snapshots out through the gateway.

use super::AppState;
use crate::error::GameError;
use crate::protocol::{GameView, RoomState, ServerMessage};
use crate::types::*;

impl AppState {
    /// Broadcast the room projection to everyone subscribed to it
    pub async fn publish_room(&self, room: &Room) {
        self.gateway
            .broadcast(
                &room.id,
                ServerMessage::RoomUpdate {
                    room: RoomState::from(room),
                },
            )
            .await;
    }

    /// Broadcast the public game view, then send the full board to each
    /// connected spymaster's own session
    pub async fn publish_game(&self, room: &Room) {
        let Some(game) = &room.game else {
            return;
        };

        self.gateway
            .broadcast(
                &room.id,
                ServerMessage::GameUpdate {
                    room_id: room.id.clone(),
                    version: room.version,
                    game: GameView::public(game),
                },
            )
            .await;

        let spymaster_view = GameView::spymaster(game);
        for player in room
            .players
            .iter()
            .filter(|p| p.connected && p.role == Role::Spymaster)
        {
            if let Some(session_id) = self.sessions.session_for_player(&player.id).await {
                self.gateway
                    .send_to_session(
                        &session_id,
                        ServerMessage::SpymasterBoard {
                            room_id: room.id.clone(),
                            version: room.version,
                            game: spymaster_view.clone(),
                        },
                    )
                    .await;
            }
        }
    }

    /// Room projection followed by the game views
    pub async fn publish_all(&self, room: &Room) {
        self.publish_room(room).await;
        self.publish_game(room).await;
    }

    /// Report an error to the originating session only
    pub async fn send_error(&self, session_id: &str, error: &GameError) {
        tracing::debug!("Error for session {}: {}", session_id, error);
        self.gateway
            .send_to_session(session_id, error.payload().into())
            .await;
    }
}
