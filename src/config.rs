//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working configuration.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::control::buttons::MAX_BUTTON_ID;
use crate::control::steering::Mode;
use crate::error::{BridgeError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub steering: SteeringConfig,
    #[serde(default)]
    pub roll: RollConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Extra or overriding button name to id (1-32) assignments.
    #[serde(default)]
    pub buttons: HashMap<String, u8>,
}

/// UDP endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    /// IP address to bind, or `"auto"` for the outbound local address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_datagram_size")]
    pub max_datagram_size: usize,
}

/// Steering (pitch) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SteeringConfig {
    #[serde(default)]
    pub default_mode: Mode,

    #[serde(default = "default_deadzone_deg")]
    pub deadzone_deg: f64,
}

/// Roll axis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RollConfig {
    #[serde(default = "default_roll_range_span_deg")]
    pub range_span_deg: f64,
}

/// Output backend selection
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputBackend {
    /// Linux uinput virtual joystick.
    #[default]
    Uinput,
    /// Log frames only.
    Log,
}

/// Virtual controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub backend: OutputBackend,

    #[serde(default = "default_device_name")]
    pub device_name: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty logs to the console only.
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_bind_address() -> String { crate::net::AUTO_BIND_ADDRESS.to_string() }
fn default_port() -> u16 { crate::net::DEFAULT_PORT }
fn default_max_datagram_size() -> usize { crate::net::DEFAULT_MAX_DATAGRAM_SIZE }

fn default_deadzone_deg() -> f64 { crate::control::steering::DEFAULT_DEADZONE_DEG }

fn default_roll_range_span_deg() -> f64 { crate::control::normalize::ROLL_RANGE_SPAN_DEG }

fn default_device_name() -> String { crate::output::uinput::DEFAULT_DEVICE_NAME.to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_datagram_size: default_max_datagram_size(),
        }
    }
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            default_mode: Mode::default(),
            deadzone_deg: default_deadzone_deg(),
        }
    }
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            range_span_deg: default_roll_range_span_deg(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: OutputBackend::default(),
            device_name: default_device_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

/// Largest UDP payload over IPv4.
const MAX_UDP_PAYLOAD: usize = 65507;

/// Accepted log levels.
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

fn invalid(msg: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tilt_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate network configuration
        let bind = self.network.bind_address.trim();
        if bind.is_empty() {
            return Err(invalid("bind_address cannot be empty"));
        }

        if !bind.eq_ignore_ascii_case(crate::net::AUTO_BIND_ADDRESS)
            && bind.parse::<std::net::IpAddr>().is_err()
        {
            return Err(invalid(format!(
                "bind_address must be \"auto\" or an IP address, got {:?}",
                bind
            )));
        }

        if self.network.max_datagram_size < 64 || self.network.max_datagram_size > MAX_UDP_PAYLOAD {
            return Err(invalid(format!(
                "max_datagram_size must be between 64 and {}",
                MAX_UDP_PAYLOAD
            )));
        }

        // Validate steering
        if !self.steering.deadzone_deg.is_finite()
            || self.steering.deadzone_deg < 0.0
            || self.steering.deadzone_deg > 5.0
        {
            return Err(invalid("deadzone_deg must be between 0.0 and 5.0"));
        }

        // Validate roll span
        if !self.roll.range_span_deg.is_finite()
            || self.roll.range_span_deg <= 0.0
            || self.roll.range_span_deg > 180.0
        {
            return Err(invalid("roll range_span_deg must be greater than 0.0 and at most 180.0"));
        }

        // Validate output
        if self.output.device_name.trim().is_empty() {
            return Err(invalid("output device_name cannot be empty"));
        }

        // Validate logging
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(invalid(format!(
                "log level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        // Validate button ids
        for (name, &id) in &self.buttons {
            if name.is_empty() {
                return Err(invalid("button names cannot be empty"));
            }
            if !(1..=MAX_BUTTON_ID).contains(&id) {
                return Err(invalid(format!(
                    "button {:?} id {} is out of bounds (must be 1-{})",
                    name, id, MAX_BUTTON_ID
                )));
            }
        }

        Ok(())
    }
}
