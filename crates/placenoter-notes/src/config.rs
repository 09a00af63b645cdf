use std::time::Duration;

use crate::error::ConfigError;

/// Persistence and editor tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Trailing window for coalescing collection writes and title drafts.
    pub debounce: Duration,
    /// Undo depth for editors opened on a note.
    pub history_depth: usize,
}

impl SyncConfig {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
    pub const DEFAULT_HISTORY_DEPTH: usize = 100;

    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `PLACENOTER_DEBOUNCE_MS`: write coalescing window (default: 300)
    /// - `PLACENOTER_HISTORY_DEPTH`: undo steps kept per editor (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let debounce = match env_number("PLACENOTER_DEBOUNCE_MS")? {
            Some(ms) => Duration::from_millis(ms),
            None => Self::DEFAULT_DEBOUNCE,
        };
        let history_depth = match env_number("PLACENOTER_HISTORY_DEPTH")? {
            Some(depth) => depth as usize,
            None => Self::DEFAULT_HISTORY_DEPTH,
        };
        Ok(Self {
            debounce,
            history_depth,
        })
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Self::DEFAULT_DEBOUNCE,
            history_depth: Self::DEFAULT_HISTORY_DEPTH,
        }
    }
}

fn env_number(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}
