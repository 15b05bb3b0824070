use dashmap::DashMap;
use futures::future::{self, BoxFuture};

use crate::dao::{models::GameSessionEntity, session_store::SessionStore, storage::StorageResult};

/// In-process [`SessionStore`] backed by a concurrent map.
///
/// This is the store the engine ships with; it keeps the commit protocol
/// honest and lets status queries outlive the live lock context of a
/// finished game. State does not survive a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, GameSessionEntity>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently stored. Used by resource-cleanup tests.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: GameSessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.sessions.insert(session.game_id.clone(), session);
        Box::pin(future::ready(Ok(())))
    }

    fn find(&self, game_id: &str) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let found = self.sessions.get(game_id).map(|entry| entry.clone());
        Box::pin(future::ready(Ok(found)))
    }

    fn delete(&self, game_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.sessions.remove(game_id);
        Box::pin(future::ready(Ok(())))
    }
}
