//! Persistence boundary: entity models, the [`session_store::SessionStore`]
//! trait, and the in-memory implementation shipped with the engine.

pub mod models;
pub mod session_store;
pub mod storage;
