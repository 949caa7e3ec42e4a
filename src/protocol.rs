use crate::error::ErrorPayload;
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        username: String,
    },
    JoinRoom {
        room_id: RoomId,
        username: String,
    },
    /// Resume as an existing player (after a page reload or REST room creation)
    Reconnect {
        room_id: RoomId,
        player_id: PlayerId,
    },
    ChangeTeam {
        team: Option<Team>,
        role: Role,
    },
    UpdateSettings {
        word_pack: Option<String>,
        timer_seconds: Option<u32>,
    },
    StartGame {
        #[serde(default)]
        starting_team: Option<Team>,
    },
    /// Numbers are range-checked by the game rules, not the decoder
    SubmitClue {
        word: String,
        number: i64,
    },
    MakeGuess {
        card_index: i64,
    },
    EndTurn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        session_id: SessionId,
    },
    /// Sent privately once a join, create or reconnect completed
    Joined {
        player_id: PlayerId,
        room: RoomState,
    },
    RoomUpdate {
        room: RoomState,
    },
    GameUpdate {
        room_id: RoomId,
        version: u64,
        game: GameView,
    },
    /// Full board colors, delivered only to spymasters
    SpymasterBoard {
        room_id: RoomId,
        version: u64,
        game: GameView,
    },
    Error {
        kind: String,
        message: String,
    },
}

impl From<ErrorPayload> for ServerMessage {
    fn from(payload: ErrorPayload) -> Self {
        ServerMessage::Error {
            kind: payload.kind,
            message: payload.message,
        }
    }
}

/// Immutable projection of a room for broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomState {
    pub id: RoomId,
    pub admin_id: PlayerId,
    pub players: Vec<Player>,
    pub settings: RoomSettings,
    pub created_at: DateTime<Utc>,
    pub version: u64,
    pub can_start: bool,
    pub game: Option<GameView>,
}

impl From<&Room> for RoomState {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            admin_id: room.admin_id.clone(),
            players: room.players.clone(),
            settings: room.settings.clone(),
            created_at: room.created_at,
            version: room.version,
            can_start: room.can_start(),
            game: room.game.as_ref().map(GameView::public),
        }
    }
}

/// A card as seen by one audience. `color` is None while hidden.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardView {
    pub word: String,
    pub color: Option<CardColor>,
    pub revealed: bool,
    pub selected_by: Option<PlayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameView {
    pub board: Vec<CardView>,
    pub starting_team: Team,
    pub current_team: Team,
    pub phase: GamePhase,
    pub current_clue: Option<Clue>,
    pub guesses_remaining: u8,
    pub blue_remaining: u8,
    pub red_remaining: u8,
    pub winner: Option<Team>,
    pub history: Vec<TurnRecord>,
    pub current_guesses: Vec<GuessRecord>,
    pub turn_deadline: Option<DateTime<Utc>>,
}

impl GameView {
    /// Colors of unrevealed cards stay hidden until the game is over
    pub fn public(game: &GameState) -> Self {
        Self::project(game, game.is_over())
    }

    pub fn spymaster(game: &GameState) -> Self {
        Self::project(game, true)
    }

    fn project(game: &GameState, show_all: bool) -> Self {
        Self {
            board: game
                .board
                .iter()
                .map(|c| CardView {
                    word: c.word.clone(),
                    color: (show_all || c.revealed).then_some(c.color),
                    revealed: c.revealed,
                    selected_by: c.selected_by.clone(),
                })
                .collect(),
            starting_team: game.starting_team,
            current_team: game.current_team,
            phase: game.phase,
            current_clue: game.current_clue.clone(),
            guesses_remaining: game.guesses_remaining,
            blue_remaining: game.blue_remaining,
            red_remaining: game.red_remaining,
            winner: game.winner,
            history: game.history.clone(),
            current_guesses: game.current_guesses.clone(),
            turn_deadline: game.turn_deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> GameState {
        let words: Vec<String> = (0..25).map(|i| format!("w{}", i)).collect();
        let board = crate::board::create_board(&words, Team::Red).unwrap();
        GameState::new(board, Team::Red, None)
    }

    #[test]
    fn test_public_view_hides_unrevealed_colors() {
        let mut game = game();
        game.board[3].revealed = true;

        let view = GameView::public(&game);
        for (i, card) in view.board.iter().enumerate() {
            assert_eq!(card.color.is_some(), i == 3);
        }
        assert!(GameView::spymaster(&game)
            .board
            .iter()
            .all(|c| c.color.is_some()));
    }

    #[test]
    fn test_public_view_reveals_everything_after_game_over() {
        let mut game = game();
        game.phase = GamePhase::GameOver;
        game.winner = Some(Team::Blue);
        assert!(GameView::public(&game).board.iter().all(|c| c.color.is_some()));
    }

    #[test]
    fn test_client_message_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"change_team","team":"BLUE","role":"SPYMASTER"}"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::ChangeTeam {
                team: Some(Team::Blue),
                role: Role::Spymaster
            }
        ));

        let msg: ClientMessage = serde_json::from_str(r#"{"t":"start_game"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::StartGame { starting_team: None }));
    }

    #[test]
    fn test_out_of_range_numbers_still_decode() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"submit_clue","word":"x","number":-1}"#).unwrap();
        assert!(matches!(msg, ClientMessage::SubmitClue { number: -1, .. }));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"make_guess","card_index":300}"#).unwrap();
        assert!(matches!(msg, ClientMessage::MakeGuess { card_index: 300 }));
    }

    #[test]
    fn test_error_message_shape() {
        let payload = crate::error::GameError::RoomNotFound("ABCDE-FGHJK".into()).payload();
        let json = serde_json::to_value(ServerMessage::from(payload)).unwrap();
        assert_eq!(json["t"], "error");
        assert_eq!(json["kind"], "RoomNotFound");
        assert!(json["message"].as_str().unwrap().contains("ABCDE-FGHJK"));
    }
}
