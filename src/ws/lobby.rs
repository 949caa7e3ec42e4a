//! Lobby message handlers
//!
//! Creating, joining and resuming rooms, team selection and room settings.
//! Join-like requests bind the session to a player; a session whose transport
//! already closed while the request was in flight leaves the player
//! disconnected instead of bound.

use super::handlers::require_binding;
use crate::error::GameResult;
use crate::protocol::{RoomState, ServerMessage};
use crate::session::SessionContext;
use crate::state::AppState;
use crate::types::{PlayerId, Role, Team};
use std::sync::Arc;

/// Bind the session to the player and publish the room.
///
/// Returns the private `Joined` reply, or None if the session closed before
/// the binding could take effect.
pub(crate) async fn bind_and_announce(
    state: &Arc<AppState>,
    session_id: &str,
    room_id: &str,
    player_id: PlayerId,
) -> GameResult<Option<ServerMessage>> {
    if let Some(displaced) = state
        .sessions
        .register_session(&player_id, room_id, session_id)
        .await
    {
        // The session switched identity; its previous player is no longer connected
        if let Ok(room) = state
            .mark_player_disconnected(&displaced.room_id, &displaced.player_id)
            .await
        {
            state.publish_room(&room).await;
        }
    }

    if state.sessions.consume_disconnected_session(session_id).await {
        tracing::debug!(
            "Session {} closed before binding; player {} stays disconnected",
            session_id,
            player_id
        );
        let released = state.sessions.release_session(session_id).await.is_some();
        // A newer live session may already have taken the player over
        if released || state.sessions.session_for_player(&player_id).await.is_none() {
            let room = state.mark_player_disconnected(room_id, &player_id).await?;
            state.publish_room(&room).await;
        }
        return Ok(None);
    }

    state.gateway.subscribe(room_id, session_id).await;

    let room = match state.get_room(room_id).await {
        Ok(room) => room,
        Err(e) => {
            // Evicted while we were binding
            state.sessions.release_session(session_id).await;
            state.gateway.unsubscribe(session_id).await;
            return Err(e);
        }
    };
    state.publish_all(&room).await;

    Ok(Some(ServerMessage::Joined {
        player_id,
        room: RoomState::from(&room),
    }))
}

/// Mark a create/join for `username` in flight. False if the same one already is.
async fn begin_join(state: &AppState, session_id: &str, username: &str) -> bool {
    let started = state.sessions.begin_join(session_id, username).await;
    if !started {
        tracing::debug!(
            "Dropping duplicate join for '{}' from session {}",
            username,
            session_id
        );
    }
    started
}

pub async fn handle_create_room(
    state: &Arc<AppState>,
    session_id: &str,
    username: String,
) -> GameResult<Option<ServerMessage>> {
    if !begin_join(state, session_id, &username).await {
        return Ok(None);
    }

    let result = async {
        let room = state.create_room(&username).await?;
        bind_and_announce(state, session_id, &room.id, room.admin_id.clone()).await
    }
    .await;

    state.sessions.finish_join(session_id, &username).await;
    result
}

pub async fn handle_join_room(
    state: &Arc<AppState>,
    session_id: &str,
    room_id: String,
    username: String,
) -> GameResult<Option<ServerMessage>> {
    if !begin_join(state, session_id, &username).await {
        return Ok(None);
    }

    let result = async {
        let (room, player_id) = state.join_room(&room_id, &username).await?;
        bind_and_announce(state, session_id, &room.id, player_id).await
    }
    .await;

    state.sessions.finish_join(session_id, &username).await;
    result
}

pub async fn handle_reconnect(
    state: &Arc<AppState>,
    session_id: &str,
    room_id: String,
    player_id: PlayerId,
) -> GameResult<Option<ServerMessage>> {
    let room = state.reconnect_player(&room_id, &player_id).await?;
    bind_and_announce(state, session_id, &room.id, player_id).await
}

pub async fn handle_change_team(
    state: &Arc<AppState>,
    ctx: &SessionContext,
    team: Option<Team>,
    role: Role,
) -> GameResult<Option<ServerMessage>> {
    let (room_id, player_id) = require_binding(ctx)?;
    let room = state
        .change_player_team(room_id, player_id, team, role)
        .await?;
    // Spymaster board recipients may have changed too
    state.publish_all(&room).await;
    Ok(None)
}

pub async fn handle_update_settings(
    state: &Arc<AppState>,
    ctx: &SessionContext,
    word_pack: Option<String>,
    timer_seconds: Option<u32>,
) -> GameResult<Option<ServerMessage>> {
    let (room_id, _) = require_binding(ctx)?;
    let room = state
        .update_settings(room_id, word_pack, timer_seconds)
        .await?;
    state.publish_room(&room).await;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_bind_into_evicted_room_leaves_no_binding() {
        let state = Arc::new(AppState::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        state.gateway.connect("s1", tx).await;

        let room = state.create_room("Alice").await.unwrap();
        // The reaper removes the room between join_room and the binding
        state.rooms.write().await.remove(&room.id);

        let result = bind_and_announce(&state, "s1", &room.id, room.admin_id.clone()).await;
        assert!(matches!(result, Err(GameError::RoomNotFound(_))));

        assert_eq!(state.sessions.context("s1").await.binding(), None);
        assert!(state.sessions.session_for_player(&room.admin_id).await.is_none());
        assert_eq!(state.gateway.subscriber_count(&room.id).await, 0);
    }

    #[tokio::test]
    async fn test_reconnect_on_closed_session_ends_disconnected() {
        let state = Arc::new(AppState::default());
        let room = state.create_room("Alice").await.unwrap();
        let alice = room.admin_id.clone();
        state.sessions.register_session(&alice, &room.id, "live").await;
        state.sessions.session_closed("closed").await;

        let reply = bind_and_announce(&state, "closed", &room.id, alice.clone())
            .await
            .unwrap();
        assert!(reply.is_none());
        assert!(state.sessions.session_for_player(&alice).await.is_none());

        let room = state.get_room(&room.id).await.unwrap();
        assert!(!room.player(&alice).unwrap().connected);
    }
}
