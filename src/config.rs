// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_STORE_DIR: &str = "games";
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;
pub const DEFAULT_LOG_FILTER: &str = "duel_chess=info";

pub const STORE_DIR_ENV: &str = "CHESS_STORE_DIR";
pub const LOG_FILTER_ENV: &str = "CHESS_LOG";

/// Runtime settings for the game server and console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Directory holding one JSON snapshot per game. Default: "games".
    pub store_dir: PathBuf,
    /// Per-game broadcast buffer; slower subscribers lag past it. Default: 64.
    pub broadcast_capacity: usize,
    /// `tracing` filter directive. Default: "duel_chess=info".
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Config =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies `CHESS_STORE_DIR` and `CHESS_LOG` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(STORE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(filter) = lookup(LOG_FILTER_ENV).filter(|v| !v.is_empty()) {
            self.log_filter = filter;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.store_dir, PathBuf::from("games"));
        assert_eq!(config.broadcast_capacity, 64);
        assert_eq!(config.log_filter, "duel_chess=info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"broadcastCapacity": 8}"#).unwrap();
        assert_eq!(config.broadcast_capacity, 8);
        assert_eq!(config.store_dir, PathBuf::from(DEFAULT_STORE_DIR));
    }

    #[test]
    fn env_overrides_win() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            STORE_DIR_ENV => Some("/tmp/chess".to_string()),
            LOG_FILTER_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.store_dir, PathBuf::from("/tmp/chess"));
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = Config { broadcast_capacity: 0, ..Config::default() };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
