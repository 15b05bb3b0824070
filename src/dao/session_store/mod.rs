pub mod memory;

use futures::future::BoxFuture;

use crate::dao::{models::GameSessionEntity, storage::StorageResult};

/// Abstraction over the persistence layer for quiz sessions.
///
/// The engine commits a session through this trait before broadcasting each
/// snapshot; durable backends live outside this crate. Implementations are
/// keyed by the game's business id.
pub trait SessionStore: Send + Sync {
    /// Insert or replace the stored session.
    fn save(&self, session: GameSessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a stored session by game id.
    fn find(&self, game_id: &str) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>>;
    /// Remove a stored session, if present.
    fn delete(&self, game_id: &str) -> BoxFuture<'static, StorageResult<()>>;
}
