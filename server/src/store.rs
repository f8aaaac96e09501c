//! Session persistence
//!
//! The game service only talks to storage through [`SessionStore`]. The
//! in-memory store hands out copies: a game fetched from the store is a
//! working copy, and nothing is committed until [`SessionStore::save`]
//! succeeds. Serializing access per session is the caller's job.

use crate::error::StoreError;
use async_trait::async_trait;
use log::info;
use shared::{Game, GameId};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Allocates an id and stores an empty game under it
    async fn create(&self) -> Result<Game, StoreError>;

    async fn find_by_id(&self, game_id: GameId) -> Option<Game>;

    /// Games are never removed, so a `true` answer stays true
    async fn contains(&self, game_id: GameId) -> bool {
        self.find_by_id(game_id).await.is_some()
    }

    async fn save(&self, game: &Game) -> Result<(), StoreError>;
}

struct Sessions {
    games: HashMap<GameId, Game>,
    next_game_id: GameId,
}

/// Keeps every game in a map, up to a fixed number of sessions
pub struct InMemorySessionStore {
    sessions: RwLock<Sessions>,
    max_sessions: usize,
}

impl InMemorySessionStore {
    /// Game ids start from 1 and increment for each new session.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(Sessions {
                games: HashMap::new(),
                next_game_id: 1,
            }),
            max_sessions,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.games.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self) -> Result<Game, StoreError> {
        let mut sessions = self.sessions.write().await;

        if sessions.games.len() >= self.max_sessions {
            return Err(StoreError::Capacity {
                max: self.max_sessions,
            });
        }

        let game_id = sessions.next_game_id;
        sessions.next_game_id += 1;

        let game = Game::new(game_id);
        sessions.games.insert(game_id, game.clone());
        info!("Created game {}", game_id);

        Ok(game)
    }

    async fn find_by_id(&self, game_id: GameId) -> Option<Game> {
        self.sessions.read().await.games.get(&game_id).cloned()
    }

    async fn contains(&self, game_id: GameId) -> bool {
        self.sessions.read().await.games.contains_key(&game_id)
    }

    async fn save(&self, game: &Game) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.games.insert(game.id, game.clone());
        Ok(())
    }
}
