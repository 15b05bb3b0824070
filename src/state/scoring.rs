use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Difficulty tier of a question, driving its base point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Worth 1 base point.
    Easy,
    /// Worth 2 base points.
    Medium,
    /// Worth 3 base points.
    Hard,
}

impl Difficulty {
    /// Base point value before the configured multiplier is applied.
    pub fn base_points(self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(label)
    }
}

impl FromStr for Difficulty {
    type Err = EngineError;

    /// Parse a difficulty tier.
    ///
    /// Unknown tiers are a configuration error surfaced when the question set
    /// is loaded, never during scoring.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(EngineError::Configuration(format!(
                "unknown difficulty `{other}`"
            ))),
        }
    }
}

/// Points awarded for a correct answer arriving at `position` (1-based) within
/// the open answer window.
///
/// The first responder gets the full base value; each later position loses
/// `base / 20` points (integer division), floored at zero. Small bases decay
/// by nothing at all, which is intentional.
pub fn award(base: u32, position: usize) -> u32 {
    debug_assert!(position >= 1, "arrival positions are 1-based");
    let decrement = base / 20;
    let steps = (position.saturating_sub(1)) as u32;
    base.saturating_sub(steps.saturating_mul(decrement))
}

/// Add `delta` to `current`, clamping the resulting total at `floor`.
///
/// The delta itself is never dropped; only the cumulative result is clamped,
/// so a large negative adjustment still lands on the floor rather than being
/// ignored.
pub fn apply_delta(current: i64, delta: i64, floor: i64) -> i64 {
    (current + delta).max(floor)
}
