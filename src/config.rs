use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Operational configuration for the engine and its scheduler driver.
///
/// Pure-pipeline constants (scoring weights, pool templates, length
/// thresholds) are module constants, not configuration; only the knobs an
/// operator genuinely tunes per deployment live here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Interval between poll-path scans of a persona's conversations.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Minimum age of the last inbound message before the poll path may
    /// reply. Distinct from a persona's `reply_delay_bounds`, which only
    /// delays when a forced reply is surfaced.
    #[serde(default = "default_minimum_thinking_delay_secs")]
    pub minimum_thinking_delay_secs: u64,

    /// Trailing message window consulted for the locale lock.
    #[serde(default = "default_locale_lookback_messages")]
    pub locale_lookback_messages: usize,
}

fn default_database_path() -> String {
    "kindling.db".to_string()
}

fn default_poll_interval_secs() -> u64 {
    8
}

fn default_minimum_thinking_delay_secs() -> u64 {
    15
}

fn default_locale_lookback_messages() -> usize {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            poll_interval_secs: default_poll_interval_secs(),
            minimum_thinking_delay_secs: default_minimum_thinking_delay_secs(),
            locale_lookback_messages: default_locale_lookback_messages(),
        }
    }
}

impl EngineConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Get the path to the config file (relative to executable)
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join("kindling_config.toml")
    }

    /// Load config from kindling_config.toml next to the executable, falling
    /// back to environment variables.
    pub fn load() -> Self {
        let path = Self::config_path();

        if let Ok(contents) = fs::read_to_string(&path) {
            match toml::from_str::<EngineConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    return config;
                }
                Err(e) => {
                    tracing::error!("Failed to parse {:?}: {}", path, e);
                }
            }
        }

        tracing::warn!("No config file found, using defaults + env vars");
        Self::from_env()
    }

    /// Save config to file (next to executable)
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = env::var("KINDLING_DATABASE_PATH") {
            if !path.trim().is_empty() {
                config.database_path = path;
            }
        }

        if let Ok(interval) = env::var("KINDLING_POLL_INTERVAL_SECS") {
            if let Ok(seconds) = interval.parse() {
                config.poll_interval_secs = seconds;
            }
        }

        if let Ok(delay) = env::var("KINDLING_THINKING_DELAY_SECS") {
            if let Ok(seconds) = delay.parse() {
                config.minimum_thinking_delay_secs = seconds;
            }
        }

        if let Ok(lookback) = env::var("KINDLING_LOCALE_LOOKBACK") {
            if let Ok(messages) = lookback.parse() {
                config.locale_lookback_messages = messages;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_toml_fields() {
        let config: EngineConfig =
            toml::from_str("database_path = \"/tmp/test.db\"").expect("parse partial toml");
        assert_eq!(config.database_path, "/tmp/test.db");
        assert_eq!(config.poll_interval_secs, 8);
        assert_eq!(config.minimum_thinking_delay_secs, 15);
        assert_eq!(config.locale_lookback_messages, 3);
    }
}
