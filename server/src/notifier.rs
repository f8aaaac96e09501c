//! Round-ended notifications
//!
//! Delivery is best-effort. A [`Notifier`] must return immediately; it may
//! queue, drop or log, but it never reports failure back to the caller.

use log::info;
use shared::{GameId, TURN_ENDED};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub game_id: GameId,
    pub action: String,
}

impl Notification {
    pub fn turn_ended(game_id: GameId) -> Self {
        Self {
            game_id,
            action: TURN_ENDED.to_string(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, devices: Vec<String>, message: Notification);
}

/// Notifier that only writes to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, devices: Vec<String>, message: Notification) {
        info!(
            "Game {}: action={} for {} device(s)",
            message.game_id,
            message.action,
            devices.len()
        );
    }
}
