//! Engine configuration loading, with baked-in defaults matching the
//! original trivia product settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the engine looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/engine.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_ENGINE_CONFIG_PATH";

/// Maximum number of questions dealt into a single game.
const DEFAULT_QUESTIONS_PER_GAME: usize = 20;
/// Grace period of the answer window and of the all-answered advance delay.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);
/// Multiplier applied to difficulty base points.
const DEFAULT_SCORE_MULTIPLIER: u32 = 1;
/// Floor below which a cumulative score can never drop.
const DEFAULT_SCORE_FLOOR: i64 = 0;
/// Capacity of the snapshot broadcast channel.
const DEFAULT_SNAPSHOT_CAPACITY: usize = 16;

/// Immutable runtime configuration shared across the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cap on the question set of a new game.
    pub questions_per_game: usize,
    /// Delay before a scheduled advance fires.
    pub grace_period: Duration,
    /// Multiplier applied to difficulty base points.
    pub score_multiplier: u32,
    /// Clamp floor for cumulative scores.
    pub score_floor: i64,
    /// Broadcast channel capacity of the built-in snapshot hub.
    pub snapshot_capacity: usize,
}

impl EngineConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), ?config, "loaded engine config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            questions_per_game: DEFAULT_QUESTIONS_PER_GAME,
            grace_period: DEFAULT_GRACE_PERIOD,
            score_multiplier: DEFAULT_SCORE_MULTIPLIER,
            score_floor: DEFAULT_SCORE_FLOOR,
            snapshot_capacity: DEFAULT_SNAPSHOT_CAPACITY,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    questions_per_game: Option<usize>,
    grace_period_secs: Option<u64>,
    score_multiplier: Option<u32>,
    score_floor: Option<i64>,
    snapshot_capacity: Option<usize>,
}

impl From<RawConfig> for EngineConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = EngineConfig::default();
        Self {
            questions_per_game: value
                .questions_per_game
                .unwrap_or(defaults.questions_per_game),
            grace_period: value
                .grace_period_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.grace_period),
            score_multiplier: value.score_multiplier.unwrap_or(defaults.score_multiplier),
            score_floor: value.score_floor.unwrap_or(defaults.score_floor),
            snapshot_capacity: value.snapshot_capacity.unwrap_or(defaults.snapshot_capacity),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
