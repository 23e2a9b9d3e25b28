use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clipboard::command::COMMAND_TIMEOUT;
use crate::error::{AppError, AppResult};

const MIN_POLL_INTERVAL_MS: u64 = 50;
const MIN_WATCH_READ_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub db_path: Option<PathBuf>,
    /// Persisted into the store when set; otherwise the store's value wins.
    pub history_limit: Option<i64>,
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            history_limit: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Config file (if any) overlaid with `CLIPSTACK_*` environment variables.
    pub fn load() -> AppResult<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path).map_err(|err| {
                    AppError::Config(format!("failed to read {}: {err}", path.display()))
                })?;
                Self::from_toml(&content)?
            }
            _ => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|err| AppError::Config(err.to_string()))
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clipstack").join("config.toml"))
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CLIPSTACK_DB").filter(|value| !value.is_empty()) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(limit) = lookup("CLIPSTACK_HISTORY_LIMIT") {
            let limit = limit.trim().parse::<i64>().map_err(|_| {
                AppError::Config(format!("CLIPSTACK_HISTORY_LIMIT is not a number: {limit}"))
            })?;
            self.history_limit = Some(limit);
        }
        if let Some(poll) = lookup("CLIPSTACK_POLL_MS") {
            self.poll_interval_ms = poll.trim().parse::<u64>().map_err(|_| {
                AppError::Config(format!("CLIPSTACK_POLL_MS is not a number: {poll}"))
            })?;
        }
        Ok(())
    }

    pub fn resolve_db_path(&self) -> AppResult<PathBuf> {
        self.db_path
            .clone()
            .or_else(default_db_path)
            .ok_or_else(|| AppError::Config("cannot determine home directory".to_string()))
    }

    pub fn history_limit(&self) -> Option<i64> {
        self.history_limit.map(|limit| limit.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    /// Deadline for one clipboard tool run while watching. Tracks the poll
    /// interval so a hung tool cannot stall cancellation for long.
    pub fn watch_read_timeout(&self) -> Duration {
        self.poll_interval().clamp(MIN_WATCH_READ_TIMEOUT, COMMAND_TIMEOUT)
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".clipstack").join("history.db"))
}
