//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `fleetsync.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use fleetsync_adapter_simulator::SimulatorConfig;
use fleetsync_app::broadcaster::{BroadcastMode, BroadcasterConfig};

/// Database URL selecting the volatile in-process store.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Mutation simulator settings.
    pub simulator: SimulatorSettings,
    /// Realtime broadcaster settings.
    pub broadcaster: BroadcasterSettings,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Store configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL, or `memory` for the in-process store.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Mutation simulator timers, all in milliseconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    pub enabled: bool,
    pub create_interval_ms: u64,
    pub update_interval_ms: u64,
    pub delete_interval_ms: u64,
    /// Upper bound of the simulator's tracking set.
    pub max_tracked: usize,
    pub seed: Option<u64>,
}

/// Realtime broadcaster settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BroadcasterSettings {
    pub enabled: bool,
    pub interval_ms: u64,
    /// `bypass` or `strict`.
    pub mode: String,
    /// Per-observer queue length.
    pub observer_buffer: usize,
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from `fleetsync.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("fleetsync.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| lookup(key).and_then(|val| val.trim().parse::<u64>().ok());

        if let Some(val) = lookup("FLEETSYNC_HOST") {
            self.server.host = val;
        }
        if let Some(port) = lookup("FLEETSYNC_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some((host, port)) = lookup("FLEETSYNC_BIND")
            .as_deref()
            .and_then(|val| val.rsplit_once(':'))
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = lookup("FLEETSYNC_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = lookup("FLEETSYNC_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(ms) = number("FLEETSYNC_CREATE_INTERVAL") {
            self.simulator.create_interval_ms = ms;
        }
        if let Some(ms) = number("FLEETSYNC_UPDATE_INTERVAL") {
            self.simulator.update_interval_ms = ms;
        }
        if let Some(ms) = number("FLEETSYNC_DELETE_INTERVAL") {
            self.simulator.delete_interval_ms = ms;
        }
        if let Some(ms) = number("FLEETSYNC_BROADCAST_INTERVAL") {
            self.broadcaster.interval_ms = ms;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        let intervals = [
            ("simulator.create_interval_ms", self.simulator.create_interval_ms),
            ("simulator.update_interval_ms", self.simulator.update_interval_ms),
            ("simulator.delete_interval_ms", self.simulator.delete_interval_ms),
            ("broadcaster.interval_ms", self.broadcaster.interval_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::Validation(format!("{name} must be non-zero")));
        }
        if self.simulator.max_tracked == 0 {
            return Err(ConfigError::Validation(
                "simulator.max_tracked must be non-zero".to_string(),
            ));
        }
        if self.broadcaster.observer_buffer == 0 {
            return Err(ConfigError::Validation(
                "broadcaster.observer_buffer must be non-zero".to_string(),
            ));
        }
        self.broadcast_mode()?;
        Ok(())
    }

    fn broadcast_mode(&self) -> Result<BroadcastMode, ConfigError> {
        self.broadcaster
            .mode
            .parse::<BroadcastMode>()
            .map_err(|err| ConfigError::Validation(err.to_string()))
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Whether the volatile in-process store was requested.
    #[must_use]
    pub fn uses_memory_store(&self) -> bool {
        self.database.url == MEMORY_DATABASE_URL
    }

    /// Timers and bounds for the mutation simulator.
    #[must_use]
    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            create_interval: Duration::from_millis(self.simulator.create_interval_ms),
            update_interval: Duration::from_millis(self.simulator.update_interval_ms),
            delete_interval: Duration::from_millis(self.simulator.delete_interval_ms),
            max_tracked: self.simulator.max_tracked,
            seed: self.simulator.seed,
        }
    }

    /// Settings for the realtime broadcaster.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an unknown broadcast mode.
    pub fn broadcaster_config(&self) -> Result<BroadcasterConfig, ConfigError> {
        Ok(BroadcasterConfig {
            interval: Duration::from_millis(self.broadcaster.interval_ms),
            mode: self.broadcast_mode()?,
            observer_buffer: self.broadcaster.observer_buffer,
            seed: self.broadcaster.seed,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:fleetsync.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fleetsyncd=info,fleetsync=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            create_interval_ms: 30_000,
            update_interval_ms: 10_000,
            delete_interval_ms: 60_000,
            max_tracked: 256,
            seed: None,
        }
    }
}

impl Default for BroadcasterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5_000,
            mode: BroadcastMode::default().to_string(),
            observer_buffer: 32,
            seed: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
