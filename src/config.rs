//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{CodroneError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

/// Link session timing
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LinkConfig {
    /// How long `request` waits for the answering frame
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long each `send_and_wait_ack` attempt waits for an Ack
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,

    #[serde(default = "default_ack_retries")]
    pub ack_retries: u32,

    /// Age at which a partially received frame is abandoned
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,

    /// Pause between polls in `wait_until`
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pause after clearing the gyro bias before polling starts
    #[serde(default = "default_calibration_delay_ms")]
    pub calibration_delay_ms: u64,

    /// Earliest point after polling starts at which `reset_gyro` accepts a
    /// not-calibrating report
    #[serde(default = "default_min_calibration_ms")]
    pub min_calibration_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_read_buffer_size() -> usize { 256 }

fn default_request_timeout_ms() -> u64 { 2000 }
fn default_ack_timeout_ms() -> u64 { 200 }
fn default_ack_retries() -> u32 { 3 }
fn default_receive_timeout_ms() -> u64 { 600 }
fn default_poll_interval_ms() -> u64 { 100 }
fn default_calibration_delay_ms() -> u64 { 200 }
fn default_min_calibration_ms() -> u64 { 3000 }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            ack_timeout_ms: default_ack_timeout_ms(),
            ack_retries: default_ack_retries(),
            receive_timeout_ms: default_receive_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            calibration_delay_ms: default_calibration_delay_ms(),
            min_calibration_ms: default_min_calibration_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LinkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn calibration_delay(&self) -> Duration {
        Duration::from_millis(self.calibration_delay_ms)
    }

    pub fn min_calibration(&self) -> Duration {
        Duration::from_millis(self.min_calibration_ms)
    }
}

fn invalid(message: impl std::fmt::Display) -> CodroneError {
    CodroneError::Config(toml::de::Error::custom(message))
}

fn check_range_ms(name: &str, value: u64, max: u64) -> Result<()> {
    if value == 0 || value > max {
        return Err(invalid(format!("{} must be between 1 and {}", name, max)));
    }
    Ok(())
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
    /// use codrone_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
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
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![9600, 57600, 115200].contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 57600, 115200"));
        }

        if self.serial.read_buffer_size == 0 || self.serial.read_buffer_size > 4096 {
            return Err(invalid("read_buffer_size must be between 1 and 4096"));
        }

        check_range_ms("request_timeout_ms", self.link.request_timeout_ms, 60000)?;
        check_range_ms("ack_timeout_ms", self.link.ack_timeout_ms, 10000)?;
        check_range_ms("receive_timeout_ms", self.link.receive_timeout_ms, 10000)?;
        check_range_ms("poll_interval_ms", self.link.poll_interval_ms, 10000)?;

        if self.link.calibration_delay_ms > 10000 {
            return Err(invalid("calibration_delay_ms must be at most 10000"));
        }

        if self.link.min_calibration_ms > 60000 {
            return Err(invalid("min_calibration_ms must be at most 60000"));
        }

        if self.link.ack_retries == 0 || self.link.ack_retries > 10 {
            return Err(invalid("ack_retries must be between 1 and 10"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "logging level must be one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }
}
