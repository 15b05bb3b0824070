use thiserror::Error;

use crate::{dao::storage::StorageError, state::state_machine::InvalidTransition};

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the quiz session engine.
///
/// Every variant is local to a single game; no error here affects other
/// sessions. Note that a late answer submitted to a finished game is *not* an
/// error: the resolver returns the last committed snapshot unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown game or participant. Non-fatal, no state was changed.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation is not legal in the session's current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Bad question set or engine settings, detected at load/start time.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The session store failed to commit.
    #[error("storage unavailable")]
    Storage(#[source] StorageError),
    /// An internal invariant was observed broken. Should be unreachable given
    /// the per-game locking discipline; the session is force-terminated when
    /// this is detected, rather than left inconsistent.
    #[error("concurrency violation: {0}")]
    ConcurrencyViolation(String),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        EngineError::Storage(err)
    }
}

impl From<InvalidTransition> for EngineError {
    fn from(err: InvalidTransition) -> Self {
        EngineError::InvalidState(err.to_string())
    }
}
