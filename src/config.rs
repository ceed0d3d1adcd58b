// SPDX-License-Identifier: Apache-2.0 OR MIT

//! YAML configuration for the bridge.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Poll cadence of the packet loop, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: f64,
    /// Connection settings for the transport collaborator.
    #[serde(default)]
    pub bus: BusConfig,
    /// Per-topic configurations.
    pub topics: Vec<TopicConfig>,
}

/// Message-bus connection settings.
///
/// Consumed by the transport implementation, not by the core; carried
/// here so one file configures the whole process.
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Broker host name or address.
    #[serde(default = "default_address")]
    pub address: String,
    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection keep-alive / timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Configuration for a single subscribed topic.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicConfig {
    /// Bus address to subscribe to (exact match on inbound messages).
    pub topic: String,
    /// Output field identifier. Required non-empty.
    #[serde(default)]
    pub name: String,
    /// Unit system spelling: `US`, `METRIC` or `METRICWX`. None = US.
    #[serde(default)]
    pub unit: Option<String>,
    /// Treat the payload as a monotonic counter and emit deltas.
    #[serde(default)]
    pub calc_delta: bool,
    /// Multiplier applied after any delta conversion.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Offset applied after scaling.
    #[serde(default)]
    pub offset: f64,
}

fn default_poll_interval() -> f64 {
    1.0
}

fn default_address() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_timeout() -> u64 {
    10
}

fn default_scale() -> f64 {
    1.0
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Configuration errors. Fatal at startup; never produced at runtime.
#[derive(Debug)]
pub enum ConfigError {
    /// YAML parsing failed.
    Yaml(serde_yaml::Error),
    /// File I/O failed.
    Io(std::io::Error),
    /// A topic has no output field name configured.
    MissingFieldName { topic: String },
    /// A topic's `unit` is not one of US, METRIC, METRICWX.
    InvalidUnit { topic: String, unit: String },
    /// Two topic entries share the same bus address.
    DuplicateTopic(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Yaml(e) => write!(f, "YAML parse error: {}", e),
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::MissingFieldName { topic } => {
                write!(f, "topic '{}' has no 'name' configured", topic)
            }
            ConfigError::InvalidUnit { topic, unit } => {
                write!(
                    f,
                    "topic '{}' unit '{}' must be US, METRIC or METRICWX",
                    topic, unit
                )
            }
            ConfigError::DuplicateTopic(topic) => {
                write!(f, "topic '{}' configured more than once", topic)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Yaml(e) => Some(e),
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl BridgeConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Poll cadence as a `Duration`. Non-positive, non-finite or
    /// `Duration`-overflowing values fall back to the 1-second default.
    pub fn poll_interval(&self) -> Duration {
        let secs = self.poll_interval_secs;
        if secs > 0.0 {
            if let Ok(interval) = Duration::try_from_secs_f64(secs) {
                return interval;
            }
        }
        Duration::from_secs_f64(default_poll_interval())
    }
}
