use tokio::sync::broadcast;
use tracing::trace;

use crate::{
    dto::{
        events::{EventPayload, ServerEvent, game_topic, joker_topic},
        game::{GameSnapshot, JokerEvent},
    },
    state::SharedEngine,
};

/// Collaborator contract for delivering engine events to clients.
///
/// `publish` is fire-and-forget: snapshots are idempotent full-state
/// replacements, so at-least-once delivery over any transport is acceptable
/// and failures must never stall the per-game lock.
pub trait Broadcaster: Send + Sync {
    /// Deliver one event to whoever listens on its topic.
    fn publish(&self, event: ServerEvent);
}

/// Built-in [`Broadcaster`] backed by a Tokio broadcast channel.
///
/// The transport layer (WebSocket, SSE, ...) subscribes and fans events out;
/// lagging or absent subscribers are silently dropped.
pub struct SnapshotHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SnapshotHub {
    /// Construct a hub with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }
}

impl Broadcaster for SnapshotHub {
    fn publish(&self, event: ServerEvent) {
        trace!(topic = %event.topic, "publishing event");
        let _ = self.sender.send(event);
    }
}

/// Publish a committed game snapshot on the game's topic.
///
/// Callers invoke this while still holding the game's lock so the per-game
/// snapshot order equals commit order.
pub fn broadcast_game_snapshot(engine: &SharedEngine, snapshot: GameSnapshot) {
    let topic = game_topic(&snapshot.game_id);
    engine.broadcaster().publish(ServerEvent {
        topic,
        payload: EventPayload::Game(snapshot),
    });
}

/// Publish a joker notification on the game's joker side-channel.
pub fn broadcast_joker(engine: &SharedEngine, game_id: &str, event: JokerEvent) {
    engine.broadcaster().publish(ServerEvent {
        topic: joker_topic(game_id),
        payload: EventPayload::Joker(event),
    });
}
