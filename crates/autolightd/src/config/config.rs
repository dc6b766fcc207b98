//! Configuration file parsing and structures.
//!
//! autolightd reads a single TOML file. Defaults are applied while
//! deserializing, and cross-field constraints are checked by
//! [`Config::validate`] before the engine ever sees the values.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use super::lighting::NaturalLightingSettings;
use super::lighting::TransitionsConfig;
use super::rooms::RoomSettings;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Statestream source; required by the daemon, optional for `--check`
    #[serde(default)]
    pub mqtt: Option<MqttConfig>,

    /// REST endpoint used to call services
    #[serde(default)]
    pub home_assistant: Option<HomeAssistantConfig>,

    #[serde(default)]
    pub transitions: TransitionsConfig,

    /// Natural lighting is enabled when this section is present
    #[serde(default)]
    pub natural_lighting: Option<NaturalLightingSettings>,

    #[serde(default)]
    pub rooms: BTreeMap<String, RoomSettings>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Per-target filter for the tracing subscriber
    pub fn targets(&self) -> Targets {
        Targets::new()
            .with_default(LevelFilter::from(self.level))
            .with_targets(
                self.overrides
                    .iter()
                    .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
            )
    }
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "autolightd".to_string()
}

fn default_statestream_prefix() -> String {
    "homeassistant/statestream".to_string()
}

fn default_sync_timeout_secs() -> u64 {
    3
}

/// Connection to the MQTT broker carrying Home Assistant's statestream
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address
    pub broker: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Base topic configured for `mqtt_statestream`
    #[serde(default = "default_statestream_prefix")]
    pub statestream_prefix: String,

    /// How long to collect retained state before the engine starts
    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Home Assistant REST API access
#[derive(Debug, Clone, Deserialize)]
pub struct HomeAssistantConfig {
    /// Base URL, e.g. "http://homeassistant.local:8123"
    pub url: String,

    /// Long-lived access token
    pub token: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref natural) = self.natural_lighting {
            natural.validate()?;
        }

        for (name, room) in &self.rooms {
            room.validate(name)?;
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
