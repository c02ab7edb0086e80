//! Service configuration
//!
//! Loaded from an optional TOML file (`fleet-monitor.toml`, or the path in
//! `FLEET_CONFIG`) overlaid by `FLEET__`-prefixed environment variables,
//! e.g. `FLEET__SERVER__ADDR=0.0.0.0:9000` or
//! `FLEET__ENGINE__SCHEDULER__EVALUATION_INTERVAL_MS=30000`.

use crate::rate_limit::RateLimitConfig;
use config::{Config, Environment, File, Source};
use fleet_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

/// Default configuration file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "fleet-monitor.toml";

/// Configuration errors (fatal at startup)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
}

/// HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Allowed dashboard origins; empty allows any
    pub cors_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Level {
        Level::from_str(&self.level).unwrap_or(Level::INFO)
    }
}

impl AppConfig {
    /// Load from `FLEET_CONFIG` or the default file, then the environment
    pub fn load() -> Result<Self, ConfigError> {
        let file = match std::env::var("FLEET_CONFIG") {
            Ok(path) => File::with_name(&path).required(true),
            Err(_) => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Self::build(file)
    }

    fn build<S>(file: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("FLEET")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        SocketAddr::from_str(&self.server.addr)
            .map_err(|e| ConfigError::Invalid(format!("server.addr {}: {}", self.server.addr, e)))?;
        self.server
            .rate_limit
            .validate()
            .map_err(ConfigError::Invalid)?;
        Level::from_str(&self.logging.level).map_err(|_| {
            ConfigError::Invalid(format!("unknown log level {:?}", self.logging.level))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<AppConfig, ConfigError> {
        AppConfig::build(File::from_str(toml, FileFormat::Toml))
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.addr, "0.0.0.0:8080");
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.engine.scheduler.evaluation_interval_ms, 60_000);
        assert_eq!(config.logging.level(), Level::INFO);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = from_toml(
            r#"
            [server]
            addr = "127.0.0.1:9000"

            [engine.alerts]
            declining_evaluations = 4

            [engine.scheduler]
            evaluate_on_ingest = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.addr, "127.0.0.1:9000");
        assert_eq!(config.engine.alerts.declining_evaluations, 4);
        assert_eq!(config.engine.alerts.resolve_after, 2);
        assert!(config.engine.scheduler.evaluate_on_ingest);
        assert_eq!(config.engine.scoring.window_size, 10);
    }

    #[test]
    fn test_inconsistent_weights_fatal() {
        let err = from_toml(
            r#"
            [engine.scoring]
            temperature_weight = 0.5
            voltage_weight = 0.5
            cycle_weight = 0.5
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_address_rejected() {
        let err = from_toml("[server]\naddr = \"not-an-address\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let err = from_toml("[logging]\nlevel = \"loud\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
