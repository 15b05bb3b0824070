//! Inbound command payloads and outbound snapshot/event projections.

pub mod events;
pub mod game;
