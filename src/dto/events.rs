use serde::Serialize;

use crate::dto::game::{GameSnapshot, JokerEvent};

/// Envelope delivered to the external broadcaster.
#[derive(Debug, Clone, Serialize)]
pub struct ServerEvent {
    /// Topic to publish on (one topic per game, plus a joker side-channel).
    pub topic: String,
    /// Typed payload.
    pub payload: EventPayload,
}

/// Payload kinds the engine emits.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Full-state game snapshot.
    Game(GameSnapshot),
    /// Joker notification.
    Joker(JokerEvent),
}

/// Topic carrying snapshots for one game.
pub fn game_topic(game_id: &str) -> String {
    format!("game/{game_id}")
}

/// Topic carrying joker notifications for one game.
pub fn joker_topic(game_id: &str) -> String {
    format!("game/joker/{game_id}")
}
