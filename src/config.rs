//! Configuration loading and management.
//!
//! Everything the daemon treats as tunable lives here: the listen address,
//! the upstream listing URL, the per-session poll cadence, the trailing
//! "recent" window, and the database path. All sections have full defaults
//! so a minimal (or empty) config file is valid.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP/WebSocket listener.
    #[serde(default)]
    pub server: ServerConfig,
    /// Scrape cadence and window.
    #[serde(default)]
    pub scrape: ScrapeConfig,
    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server (WebSocket upgrade, /status, /metrics) binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Scrape cycle configuration, shared by every connected session.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// Listing page to scrape.
    #[serde(default = "default_source_url")]
    pub source_url: String,
    /// Per-session poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Trailing window, in seconds, bounding what counts as "recent".
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            poll_interval_ms: default_poll_interval_ms(),
            window_secs: default_window_secs(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path. `":memory:"` is supported for tests.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_listen() -> SocketAddr {
    "0.0.0.0:3001".parse().expect("static socket addr")
}

fn default_source_url() -> String {
    "https://news.ycombinator.com/".to_string()
}

fn default_poll_interval_ms() -> u64 {
    300_000
}

fn default_window_secs() -> u64 {
    300
}

fn default_db_path() -> String {
    "newswired.db".to_string()
}
