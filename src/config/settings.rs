//! Server settings
//!
//! Loads settings from `othello.toml`. A missing file yields defaults and
//! every key is optional.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{DEFAULT_SEARCH_DEPTH, MAX_SEARCH_DEPTH};

/// Default configuration file name
pub const CONFIG_FILE: &str = "othello.toml";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_INTENT_TIMEOUT_MS: u64 = 30_000;

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// `[server]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind to
    pub bind: String,
    /// Port to listen on
    pub port: u16,
    /// How long an intent waits for a busy session, in milliseconds
    pub intent_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            intent_timeout_ms: DEFAULT_INTENT_TIMEOUT_MS,
        }
    }
}

/// `[bot]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Search depth in plies
    pub depth: usize,
    /// Shuffle root moves so equal lines vary between games
    pub randomize: bool,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            depth: DEFAULT_SEARCH_DEPTH,
            randomize: true,
        }
    }
}

/// Full server configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub bot: BotSettings,
}

impl Settings {
    /// Load settings from `path`, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Check value ranges once all overrides are applied
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind must not be empty".into()));
        }
        if self.server.intent_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.intent_timeout_ms must be positive".into(),
            ));
        }
        if !(1..=MAX_SEARCH_DEPTH).contains(&self.bot.depth) {
            return Err(ConfigError::Invalid(format!(
                "bot.depth must be between 1 and {}, got {}",
                MAX_SEARCH_DEPTH, self.bot.depth
            )));
        }
        Ok(())
    }

    pub fn intent_timeout(&self) -> Duration {
        Duration::from_millis(self.server.intent_timeout_ms)
    }
}
