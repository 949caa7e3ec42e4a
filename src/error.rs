//! Error taxonomy shared by the room directory, the game state machine and the
//! transport adapters.

use crate::types::Team;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Result type for room and game operations
pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Player {0} not found in room")]
    PlayerNotFound(String),

    #[error("Username '{0}' is already taken in this room")]
    UsernameAlreadyExists(String),

    #[error("Team {0} already has a spymaster")]
    SpymasterAlreadyExists(Team),

    #[error("Cannot start game: {0}")]
    GameStart(String),

    #[error("Need at least {required} distinct words, got {available}")]
    InsufficientWords { required: usize, available: usize },

    #[error("Word pack '{0}' not found")]
    WordPackNotFound(String),

    #[error("Invalid clue: {0}")]
    InvalidClue(String),

    #[error("Invalid guess: {0}")]
    InvalidGuess(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Room limit of {0} reached, try again later")]
    RoomLimitReached(usize),
}

impl GameError {
    /// Stable identifier sent to clients in the `kind` field
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::RoomNotFound(_) => "RoomNotFound",
            GameError::PlayerNotFound(_) => "PlayerNotFound",
            GameError::UsernameAlreadyExists(_) => "UsernameAlreadyExists",
            GameError::SpymasterAlreadyExists(_) => "SpymasterAlreadyExists",
            GameError::GameStart(_) => "GameStartException",
            GameError::InsufficientWords { .. } => "InsufficientWords",
            GameError::WordPackNotFound(_) => "WordPackNotFound",
            GameError::InvalidClue(_) => "InvalidClue",
            GameError::InvalidGuess(_) => "InvalidGuess",
            GameError::InvalidState(_) => "InvalidState",
            GameError::InvalidRequest(_) => "InvalidRequest",
            GameError::RoomLimitReached(_) => "RoomLimitReached",
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GameError::RoomNotFound(_)
            | GameError::PlayerNotFound(_)
            | GameError::WordPackNotFound(_) => StatusCode::NOT_FOUND,
            GameError::UsernameAlreadyExists(_) | GameError::SpymasterAlreadyExists(_) => {
                StatusCode::CONFLICT
            }
            GameError::RoomLimitReached(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Error body delivered to the originating client only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::warn!("Request rejected: {}", self);
        }
        (self.status(), Json(self.payload())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_start_kind_matches_wire_name() {
        let err = GameError::GameStart("teams not ready".to_string());
        assert_eq!(err.kind(), "GameStartException");
        assert_eq!(err.payload().message, "Cannot start game: teams not ready");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GameError::RoomNotFound("X".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GameError::UsernameAlreadyExists("bob".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            GameError::InvalidClue("blank".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
