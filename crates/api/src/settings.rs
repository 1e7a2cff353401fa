//! Application settings
//!
//! Loaded in three layers: built-in defaults, an optional TOML file, then
//! `DRIVER_SAFETY__*` environment variables (`__` separates nesting, e.g.
//! `DRIVER_SAFETY__ESCALATION__ESCALATION_DELAY_SECS=30`).

use crate::rate_limit::RateLimitConfig;
use alerting::EscalationConfig;
use config::{Config, Environment, File, FileFormat};
use routing::DirectionsConfig;
use sensors::{Position, SamplerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings file read when `DRIVER_SAFETY_CONFIG` is not set
pub const DEFAULT_CONFIG_FILE: &str = "driver-safety.toml";

/// Environment variable naming an alternative settings file
pub const CONFIG_PATH_ENV: &str = "DRIVER_SAFETY_CONFIG";

const ENV_PREFIX: &str = "DRIVER_SAFETY";

/// Settings error types
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// Apply per-IP rate limiting to mutating routes
    pub rate_limit_enabled: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            rate_limit_enabled: true,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Map display settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// Center used before the first location fix
    pub default_center: Position,
}

/// Complete application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub sampler: SamplerConfig,
    pub escalation: EscalationConfig,
    pub map: MapSettings,
    pub directions: DirectionsConfig,
    pub rate_limit: RateLimitConfig,
}

impl Settings {
    /// Load from the file named by `DRIVER_SAFETY_CONFIG` (or the default file)
    pub fn load() -> Result<Self, SettingsError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from a specific file; a missing file falls back to defaults
    pub fn load_from(path: &str) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the monitor cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let thresholds = &self.escalation.thresholds;
        if thresholds.low_bpm > thresholds.high_bpm {
            return Err(SettingsError::Invalid(format!(
                "low threshold {} is above high threshold {}",
                thresholds.low_bpm, thresholds.high_bpm
            )));
        }
        if self.escalation.escalation_delay_secs == 0 {
            return Err(SettingsError::Invalid(
                "escalation delay must be at least one second".to_string(),
            ));
        }
        if self.escalation.default_contact.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "default emergency contact is empty".to_string(),
            ));
        }
        if self.sampler.interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "sample interval must be positive".to_string(),
            ));
        }
        if !self.map.default_center.is_valid() {
            return Err(SettingsError::Invalid(
                "default map center is not a valid position".to_string(),
            ));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(SettingsError::Invalid(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }
        if self.rate_limit.per_second == 0 || self.rate_limit.burst_size == 0 {
            return Err(SettingsError::Invalid(
                "rate limit values must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
