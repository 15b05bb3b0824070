//! Shared engine state: the `gameId`-keyed context map and the per-game
//! serialization primitives.

pub mod game;
pub mod scoring;
pub mod state_machine;

use std::sync::{Arc, Mutex as StdMutex};

use dashmap::DashMap;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::debug;

use crate::{
    config::EngineConfig,
    dao::session_store::{SessionStore, memory::MemorySessionStore},
    services::broadcast::{Broadcaster, SnapshotHub},
    state::game::GameSession,
};

/// Shared handle to the engine, cheap to clone.
pub type SharedEngine = Arc<EngineState>;

/// Handle to the advance task currently scheduled for a game.
///
/// The generation token mirrors [`GameSession::timer_generation`]: a callback
/// that fires with a stale generation lost a race to a newer schedule (or to
/// an all-answered advance) and must leave the session untouched.
#[derive(Debug)]
pub struct AdvanceTimer {
    /// Generation this timer was scheduled under.
    pub generation: u64,
    handle: JoinHandle<()>,
}

impl AdvanceTimer {
    /// Bundle a generation token with its spawned task handle.
    pub fn new(generation: u64, handle: JoinHandle<()>) -> Self {
        Self { generation, handle }
    }
}

/// Per-game context owned by the engine: the fair serialization lock around
/// the session plus the pending advance timer.
///
/// All mutation for one `gameId` funnels through [`GameContext::session`];
/// tokio's mutex queues waiters in FIFO order, which is what makes lock
/// acquisition order the authoritative answer arrival order.
pub struct GameContext {
    session: Mutex<GameSession>,
    timer: StdMutex<Option<AdvanceTimer>>,
}

impl GameContext {
    /// Wrap a session into its lock/timer context.
    pub fn new(session: GameSession) -> Self {
        Self {
            session: Mutex::new(session),
            timer: StdMutex::new(None),
        }
    }

    /// The fair per-game lock guarding every session mutation.
    pub fn session(&self) -> &Mutex<GameSession> {
        &self.session
    }

    /// Install a newly scheduled advance timer, atomically retiring (and
    /// aborting) the previous one. At most one timer is live per game.
    pub fn install_timer(&self, timer: AdvanceTimer) {
        let mut slot = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(timer) {
            previous.handle.abort();
        }
    }

    /// Abort and discard the pending timer, if any.
    pub fn clear_timer(&self) {
        let mut slot = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }
    }
}

/// Central engine state: live game contexts, the session store, and the
/// outbound broadcaster.
pub struct EngineState {
    games: DashMap<String, Arc<GameContext>>,
    store: Arc<dyn SessionStore>,
    broadcaster: Arc<dyn Broadcaster>,
    config: EngineConfig,
}

impl EngineState {
    /// Construct the engine around explicit collaborators.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> SharedEngine {
        Arc::new(Self {
            games: DashMap::new(),
            store,
            broadcaster,
            config,
        })
    }

    /// Construct a self-contained engine with the in-memory store and the
    /// built-in snapshot hub. Returns the hub so callers can subscribe.
    pub fn in_memory(config: EngineConfig) -> (SharedEngine, Arc<SnapshotHub>) {
        let hub = Arc::new(SnapshotHub::new(config.snapshot_capacity));
        let store = Arc::new(MemorySessionStore::new());
        let engine = Self::new(config, store, hub.clone());
        (engine, hub)
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Persistence collaborator.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Broadcast collaborator.
    pub fn broadcaster(&self) -> &Arc<dyn Broadcaster> {
        &self.broadcaster
    }

    /// Look up the live context for a game.
    pub fn context(&self, game_id: &str) -> Option<Arc<GameContext>> {
        self.games.get(game_id).map(|entry| entry.value().clone())
    }

    /// Register a freshly created game context. Returns false (leaving the
    /// existing context in place) when the id is already live.
    pub fn insert_context(&self, game_id: String, context: Arc<GameContext>) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.games.entry(game_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(context);
                true
            }
        }
    }

    /// Drop the live context of a game, aborting its pending timer. The lock
    /// map must be pruned explicitly; the map itself keeps keys reachable.
    pub fn remove_context(&self, game_id: &str) {
        if let Some((_, context)) = self.games.remove(game_id) {
            context.clear_timer();
            debug!(game_id, "retired game context");
        }
    }

    /// Number of games with a live context. Used by resource-cleanup tests.
    pub fn live_games(&self) -> usize {
        self.games.len()
    }
}
