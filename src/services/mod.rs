//! Engine services: the session coordinator façade, the answer race
//! resolver, the question source, and the broadcast boundary.

pub mod answer_service;
pub mod broadcast;
pub mod question_service;
pub mod session_service;
