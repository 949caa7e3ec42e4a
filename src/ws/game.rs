//! Game message handlers

use super::handlers::require_binding;
use crate::error::GameResult;
use crate::protocol::ServerMessage;
use crate::session::SessionContext;
use crate::state::AppState;
use crate::types::Team;
use std::sync::Arc;

pub async fn handle_start_game(
    state: &Arc<AppState>,
    ctx: &SessionContext,
    starting_team: Option<Team>,
) -> GameResult<Option<ServerMessage>> {
    let (room_id, _) = require_binding(ctx)?;
    let room = state.start_game(room_id, starting_team).await?;
    state.publish_all(&room).await;
    Ok(None)
}

pub async fn handle_submit_clue(
    state: &Arc<AppState>,
    ctx: &SessionContext,
    word: String,
    number: i64,
) -> GameResult<Option<ServerMessage>> {
    let (room_id, player_id) = require_binding(ctx)?;
    let room = state.submit_clue(room_id, player_id, &word, number).await?;
    state.publish_game(&room).await;
    Ok(None)
}

pub async fn handle_make_guess(
    state: &Arc<AppState>,
    ctx: &SessionContext,
    card_index: i64,
) -> GameResult<Option<ServerMessage>> {
    let (room_id, player_id) = require_binding(ctx)?;
    let (room, result) = state.make_guess(room_id, player_id, card_index).await?;
    tracing::debug!(
        "Guess in room {}: card {} was {:?} ({:?})",
        room.id,
        result.card_index,
        result.color,
        result.turn_ended
    );
    state.publish_game(&room).await;
    Ok(None)
}

pub async fn handle_end_turn(
    state: &Arc<AppState>,
    ctx: &SessionContext,
) -> GameResult<Option<ServerMessage>> {
    let (room_id, player_id) = require_binding(ctx)?;
    let room = state.end_turn(room_id, player_id).await?;
    state.publish_game(&room).await;
    Ok(None)
}
