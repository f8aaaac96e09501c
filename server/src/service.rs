//! Turn-based game service
//!
//! Every operation that touches a game runs fetch → mutate → save while
//! holding that game's lock, so two requests for the same game never
//! interleave. Requests for different games take different locks and run
//! in parallel.
//!
//! A resolved round is saved before anyone is notified. Notification is
//! handed to the [`Notifier`] after the lock is released and is never
//! awaited.

use crate::directory::PlayerDirectory;
use crate::error::GameError;
use crate::notifier::{Notification, Notifier};
use crate::store::SessionStore;
use log::{debug, error, info, warn};
use shared::{Action, Game, GameId, GameView, PlayerId, PlayerRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One mutex per existing game id, created on first use
#[derive(Default)]
struct SessionLocks {
    locks: Mutex<HashMap<GameId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    async fn acquire(&self, game_id: GameId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(game_id).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

pub struct GameService {
    store: Arc<dyn SessionStore>,
    directory: Arc<dyn PlayerDirectory>,
    notifier: Arc<dyn Notifier>,
    locks: SessionLocks,
}

impl GameService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn PlayerDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            locks: SessionLocks::default(),
        }
    }

    pub async fn register_player(&self, name: &str, device: &str) -> PlayerRecord {
        self.directory.register(name, device).await
    }

    pub async fn create_game(&self) -> Result<GameView, GameError> {
        let game = self.store.create().await.map_err(|e| {
            error!("Failed to create game: {}", e);
            e
        })?;
        Ok(game)
    }

    pub async fn get_game(&self, game_id: GameId) -> Result<GameView, GameError> {
        self.store
            .find_by_id(game_id)
            .await
            .ok_or_else(|| GameError::game_not_found(game_id))
    }

    /// Adds a player to a game.
    ///
    /// Joining twice is a no-op: the player keeps their place and their
    /// state for the current round.
    pub async fn join_game(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<GameView, GameError> {
        let _guard = self.lock_game(game_id).await?;

        let mut game = self.load(game_id).await?;
        if self.directory.find_by_id(player_id).await.is_none() {
            return Err(GameError::player_not_found(player_id));
        }

        if !game.join(player_id) {
            debug!("Player {} already in game {}", player_id, game_id);
            return Ok(game);
        }

        self.commit(&game).await?;
        info!(
            "Player {} joined game {} ({} players)",
            player_id,
            game_id,
            game.players.len()
        );

        Ok(game)
    }

    /// Validates and applies one action, resolving the round once every
    /// joined player has acted.
    ///
    /// `override_checks` skips the joined/already-moved checks. An override
    /// move by a player who never joined gives them a state outside the
    /// roster.
    pub async fn submit_move(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        action: &Action,
        override_checks: bool,
    ) -> Result<GameView, GameError> {
        let guard = self.lock_game(game_id).await?;

        let mut game = self.load(game_id).await?;
        game.validate_move(player_id, override_checks)?;

        if override_checks && !game.has_joined(player_id) {
            warn!(
                "Override move by player {} who is not on the roster of game {}",
                player_id, game_id
            );
        }

        game.apply_move(player_id, action);
        debug!(
            "Game {}: player {} played {:?} {:?}",
            game_id, player_id, action.kind, action.direction
        );

        let outcome = if game.is_round_complete() {
            Some(game.resolve_round())
        } else {
            None
        };

        self.commit(&game).await?;
        drop(guard);

        if let Some(outcome) = outcome {
            info!(
                "Game {}: round {} resolved with {} bullet(s)",
                game_id,
                outcome.round,
                outcome.record.bullets.len()
            );
            self.notify_round_ended(&game).await;
        }

        Ok(game)
    }

    /// Takes the game's lock, refusing unknown ids before a lock is created
    async fn lock_game(&self, game_id: GameId) -> Result<OwnedMutexGuard<()>, GameError> {
        if !self.store.contains(game_id).await {
            return Err(GameError::game_not_found(game_id));
        }
        Ok(self.locks.acquire(game_id).await)
    }

    async fn load(&self, game_id: GameId) -> Result<Game, GameError> {
        self.store
            .find_by_id(game_id)
            .await
            .ok_or_else(|| GameError::game_not_found(game_id))
    }

    async fn commit(&self, game: &Game) -> Result<(), GameError> {
        self.store.save(game).await.map_err(|e| {
            error!("Failed to save game {}: {}", game.id, e);
            GameError::Persistence(e)
        })
    }

    async fn notify_round_ended(&self, game: &Game) {
        let mut devices = Vec::with_capacity(game.players.len());
        for player_id in &game.players {
            match self.directory.find_by_id(*player_id).await {
                Some(player) => devices.push(player.device),
                None => warn!(
                    "No device for player {} in game {}, skipping notification",
                    player_id, game.id
                ),
            }
        }

        self.notifier.notify(devices, Notification::turn_ended(game.id));
    }
}
