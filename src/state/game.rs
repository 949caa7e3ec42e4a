use super::AppState;
use crate::board::create_board;
use crate::error::{GameError, GameResult};
use crate::game::GuessResult;
use crate::types::*;
use chrono::{DateTime, Utc};
use rand::Rng;

fn no_game_for_clue() -> GameError {
    GameError::InvalidClue("No game in progress".to_string())
}

fn no_game_for_guess() -> GameError {
    GameError::InvalidGuess("No game in progress".to_string())
}

fn check_startable(room: &Room) -> GameResult<()> {
    if room.game_in_progress() {
        return Err(GameError::InvalidState(
            "A game is already in progress".to_string(),
        ));
    }
    if !room.can_start() {
        return Err(GameError::GameStart(
            "Each team needs one connected spymaster and at least one connected operative"
                .to_string(),
        ));
    }
    Ok(())
}

impl AppState {
    /// Deal a fresh board and start the first turn.
    ///
    /// Also used for a rematch once the previous game is over.
    pub async fn start_game(&self, room_id: &str, starting_team: Option<Team>) -> GameResult<Room> {
        let handle = self.room_handle(room_id).await?;

        // Check preconditions and read settings, then release the lock while fetching words
        let settings = {
            let room = handle.lock().await;
            check_startable(&room)?;
            room.settings.clone()
        };

        let words = self
            .words
            .random_words(&settings.word_pack, BOARD_SIZE)
            .await?;

        // Re-check: players may have left while the words were being fetched
        let mut room = handle.lock().await;
        check_startable(&room)?;

        let starting_team = starting_team.unwrap_or_else(|| {
            if rand::rng().random_bool(0.5) {
                Team::Blue
            } else {
                Team::Red
            }
        });
        let board = create_board(&words, starting_team)?;
        // Settings may have changed while unlocked; the timer comes from the latest ones
        room.game = Some(GameState::new(
            board,
            starting_team,
            room.settings.timer_seconds,
        ));
        room.touch();

        tracing::info!(
            "Game started in room {} with {} going first (pack '{}')",
            room.id,
            starting_team,
            settings.word_pack
        );
        Ok(room.clone())
    }

    pub async fn submit_clue(
        &self,
        room_id: &str,
        player_id: &str,
        word: &str,
        number: i64,
    ) -> GameResult<Room> {
        self.mutate_room(room_id, |room| {
            let actor = room
                .player(player_id)
                .cloned()
                .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
            let game = room.game.as_mut().ok_or_else(no_game_for_clue)?;
            game.submit_clue(&actor, word, number)?;
            tracing::debug!("{} gave clue {:?} in room {}", actor.username, game.current_clue, room.id);
            Ok(())
        })
        .await
    }

    pub async fn make_guess(
        &self,
        room_id: &str,
        player_id: &str,
        card_index: i64,
    ) -> GameResult<(Room, GuessResult)> {
        let handle = self.room_handle(room_id).await?;
        let mut guard = handle.lock().await;
        let room = &mut *guard;

        let actor = room
            .player(player_id)
            .cloned()
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        let game = room.game.as_mut().ok_or_else(no_game_for_guess)?;
        let result = game.make_guess(&actor, card_index)?;
        if game.is_over() {
            tracing::info!("Room {} game over, {:?} wins", room.id, game.winner);
        }

        room.touch();
        Ok((room.clone(), result))
    }

    pub async fn end_turn(&self, room_id: &str, player_id: &str) -> GameResult<Room> {
        self.mutate_room(room_id, |room| {
            let actor = room
                .player(player_id)
                .cloned()
                .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
            room.game
                .as_mut()
                .ok_or_else(no_game_for_guess)?
                .end_turn(&actor)
        })
        .await
    }

    /// None while the room is in the lobby
    pub async fn get_game_state(&self, room_id: &str) -> GameResult<Option<GameState>> {
        let handle = self.room_handle(room_id).await?;
        let room = handle.lock().await;
        Ok(room.game.clone())
    }

    /// End every turn whose deadline has passed. Returns the rooms that changed.
    pub async fn expire_turns(&self, now: DateTime<Utc>) -> Vec<Room> {
        let handles: Vec<super::SharedRoom> =
            self.rooms.read().await.values().cloned().collect();

        let mut changed = Vec::new();
        for handle in handles {
            let mut room = handle.lock().await;
            let expired = room
                .game
                .as_mut()
                .is_some_and(|game| game.expire_turn(now));
            if expired {
                room.touch();
                tracing::info!("Turn timed out in room {}", room.id);
                changed.push(room.clone());
            }
        }
        changed
    }
}
