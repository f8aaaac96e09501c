//! Player lookup
//!
//! Players are registered once and referenced by id afterwards. Each record
//! carries the device address that round-ended notifications go to.

use async_trait::async_trait;
use log::info;
use shared::{PlayerId, PlayerRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    async fn find_by_id(&self, player_id: PlayerId) -> Option<PlayerRecord>;

    async fn register(&self, name: &str, device: &str) -> PlayerRecord;
}

struct Players {
    records: HashMap<PlayerId, PlayerRecord>,
    next_player_id: PlayerId,
}

pub struct InMemoryPlayerDirectory {
    players: RwLock<Players>,
}

impl InMemoryPlayerDirectory {
    pub fn new() -> Self {
        Self {
            players: RwLock::new(Players {
                records: HashMap::new(),
                next_player_id: 1,
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.records.len()
    }
}

impl Default for InMemoryPlayerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlayerDirectory for InMemoryPlayerDirectory {
    async fn find_by_id(&self, player_id: PlayerId) -> Option<PlayerRecord> {
        self.players.read().await.records.get(&player_id).cloned()
    }

    async fn register(&self, name: &str, device: &str) -> PlayerRecord {
        let mut players = self.players.write().await;

        let id = players.next_player_id;
        players.next_player_id += 1;

        let record = PlayerRecord {
            id,
            name: name.to_string(),
            device: device.to_string(),
        };
        info!("Registered player {} ({}) at {}", id, name, device);
        players.records.insert(id, record.clone());

        record
    }
}
