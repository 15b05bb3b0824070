//! Real-time quiz session engine.
//!
//! One [`state::EngineState`] hosts many concurrent games. All mutation for a
//! given game is serialized under that game's FIFO-fair lock, which makes
//! lock-acquisition order the authoritative "who answered first" order; a
//! self-rescheduling grace timer advances each question when everyone has
//! answered or when the window expires. Transport, durable storage, and
//! authentication live outside this crate, behind the [`dao::session_store`]
//! and [`services::broadcast`] boundaries.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Configure tracing subscribers so host binaries and tests get structured
/// logs with `RUST_LOG`-style filtering.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
