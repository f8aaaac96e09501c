//! Error types surfaced by the game service and its collaborators

use shared::{ErrorKind, GameId, PlayerId, Rejection};
use thiserror::Error;

/// Failures reported by a [`SessionStore`](crate::store::SessionStore)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session capacity of {max} reached")]
    Capacity { max: usize },
    #[error("failed to persist game {game_id}: {message}")]
    Write { game_id: GameId, message: String },
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("{0}")]
    NotFound(String),
    #[error("player hasn't joined this game")]
    NotJoined,
    #[error("already moved this round")]
    AlreadyMoved,
    #[error("failed to save game state: {0}")]
    Persistence(#[from] StoreError),
}

impl GameError {
    pub fn game_not_found(game_id: GameId) -> Self {
        GameError::NotFound(format!("failed to find game with id \"{}\"", game_id))
    }

    pub fn player_not_found(player_id: PlayerId) -> Self {
        GameError::NotFound(format!("failed to find player with id \"{}\"", player_id))
    }

    /// Wire-level classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::NotFound(_) => ErrorKind::NotFound,
            GameError::NotJoined => ErrorKind::NotJoined,
            GameError::AlreadyMoved => ErrorKind::AlreadyMoved,
            GameError::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }
}

impl From<Rejection> for GameError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::NotJoined => GameError::NotJoined,
            Rejection::AlreadyMoved => GameError::AlreadyMoved,
        }
    }
}
