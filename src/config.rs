//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{JourneyLoggerError, Result};
use crate::gpsd::protocol::GPSD_DEFAULT_PORT;
use crate::pigpio::protocol::PIGPIO_DEFAULT_PORT;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub gpsd: GpsdConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub fan: FanConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// gpsd connection and polling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpsdConfig {
    #[serde(default = "default_gpsd_host")]
    pub host: String,

    #[serde(default = "default_gpsd_port")]
    pub port: u16,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// Upper bound on one tick's drain, however busy gpsd is
    #[serde(default = "default_max_drain_ms")]
    pub max_drain_ms: u64,
}

/// Journey log files and session policy
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_log_interval_s")]
    pub log_interval_s: u64,

    #[serde(default = "default_grace_period_s")]
    pub grace_period_s: u64,
}

/// Fan, tachometer and temperature curve configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FanConfig {
    #[serde(default = "default_pigpio_host")]
    pub pigpio_host: String,

    #[serde(default = "default_pigpio_port")]
    pub pigpio_port: u16,

    #[serde(default = "default_fan_gpio")]
    pub fan_gpio: u32,

    #[serde(default = "default_tach_gpio")]
    pub tach_gpio: u32,

    #[serde(default = "default_control_interval_ms")]
    pub control_interval_ms: u64,

    #[serde(default = "default_temp_off_f")]
    pub temp_off_f: f64,

    #[serde(default = "default_temp_full_f")]
    pub temp_full_f: f64,

    #[serde(default = "default_temperature_path")]
    pub temperature_path: String,
}

/// Operational log output
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DiagnosticsConfig {
    /// Directory for a daily rolling log file. Empty keeps stdout only.
    #[serde(default)]
    pub log_file_dir: String,
}

// Default value functions
fn default_gpsd_host() -> String { "127.0.0.1".to_string() }
fn default_gpsd_port() -> u16 { GPSD_DEFAULT_PORT }
fn default_poll_interval_ms() -> u64 { 3000 }
fn default_drain_timeout_ms() -> u64 { 100 }
fn default_max_drain_ms() -> u64 { 1000 }

fn default_log_dir() -> String { "/home/pi/logs".to_string() }
fn default_file_prefix() -> String { "gps_log".to_string() }
fn default_log_interval_s() -> u64 { 10 }
fn default_grace_period_s() -> u64 { 120 }

fn default_pigpio_host() -> String { "127.0.0.1".to_string() }
fn default_pigpio_port() -> u16 { PIGPIO_DEFAULT_PORT }
fn default_fan_gpio() -> u32 { 18 }
fn default_tach_gpio() -> u32 { 23 }
fn default_control_interval_ms() -> u64 { 2000 }
fn default_temp_off_f() -> f64 { 122.0 }
fn default_temp_full_f() -> f64 { 158.0 }
fn default_temperature_path() -> String { "/sys/class/thermal/thermal_zone0/temp".to_string() }

impl Default for GpsdConfig {
    fn default() -> Self {
        Self {
            host: default_gpsd_host(),
            port: default_gpsd_port(),
            poll_interval_ms: default_poll_interval_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
            max_drain_ms: default_max_drain_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            file_prefix: default_file_prefix(),
            log_interval_s: default_log_interval_s(),
            grace_period_s: default_grace_period_s(),
        }
    }
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            pigpio_host: default_pigpio_host(),
            pigpio_port: default_pigpio_port(),
            fan_gpio: default_fan_gpio(),
            tach_gpio: default_tach_gpio(),
            control_interval_ms: default_control_interval_ms(),
            temp_off_f: default_temp_off_f(),
            temp_full_f: default_temp_full_f(),
            temperature_path: default_temperature_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
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
    /// use journey_logger::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration, falling back to built-in defaults when the file
    /// does not exist. Any other read or parse failure is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Parse and validate configuration from TOML text
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
    fn validate(&self) -> Result<()> {
        if self.gpsd.host.is_empty() {
            return Err(invalid("gpsd host cannot be empty"));
        }

        if self.gpsd.port == 0 {
            return Err(invalid("gpsd port must be greater than 0"));
        }

        if self.gpsd.poll_interval_ms == 0 || self.gpsd.poll_interval_ms > 60000 {
            return Err(invalid("poll_interval_ms must be between 1 and 60000"));
        }

        // The drain window has to fit comfortably inside one polling tick
        if self.gpsd.drain_timeout_ms == 0
            || self.gpsd.drain_timeout_ms >= self.gpsd.poll_interval_ms
        {
            return Err(invalid("drain_timeout_ms must be between 1 and poll_interval_ms"));
        }

        if self.gpsd.max_drain_ms < self.gpsd.drain_timeout_ms
            || self.gpsd.max_drain_ms >= self.gpsd.poll_interval_ms
        {
            return Err(invalid(
                "max_drain_ms must be between drain_timeout_ms and poll_interval_ms",
            ));
        }

        if self.logging.log_dir.is_empty() {
            return Err(invalid("log_dir cannot be empty"));
        }

        if self.logging.file_prefix.is_empty()
            || self.logging.file_prefix.contains(['/', '\\'])
        {
            return Err(invalid("file_prefix must be a non-empty file name"));
        }

        if self.logging.log_interval_s == 0 || self.logging.log_interval_s > 3600 {
            return Err(invalid("log_interval_s must be between 1 and 3600"));
        }

        if self.logging.grace_period_s == 0 || self.logging.grace_period_s > 86400 {
            return Err(invalid("grace_period_s must be between 1 and 86400"));
        }

        if self.fan.pigpio_host.is_empty() {
            return Err(invalid("pigpio_host cannot be empty"));
        }

        // Raspberry Pi user GPIOs are 0-53; pigpio notifications only cover bank 1
        if self.fan.fan_gpio > 53 {
            return Err(invalid("fan_gpio must be between 0 and 53"));
        }

        if self.fan.tach_gpio > 31 {
            return Err(invalid("tach_gpio must be between 0 and 31"));
        }

        if self.fan.fan_gpio == self.fan.tach_gpio {
            return Err(invalid("fan_gpio and tach_gpio must differ"));
        }

        if self.fan.control_interval_ms == 0 || self.fan.control_interval_ms > 60000 {
            return Err(invalid("control_interval_ms must be between 1 and 60000"));
        }

        if !self.fan.temp_off_f.is_finite()
            || !self.fan.temp_full_f.is_finite()
            || self.fan.temp_off_f >= self.fan.temp_full_f
        {
            return Err(invalid("temp_off_f must be less than temp_full_f"));
        }

        if self.fan.temperature_path.is_empty() {
            return Err(invalid("temperature_path cannot be empty"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> JourneyLoggerError {
    JourneyLoggerError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[gpsd]
host = "gps.local"

[logging]
log_dir = "/tmp/journeys"

[fan]
fan_gpio = 12
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.gpsd.host, "gps.local");
        assert_eq!(config.gpsd.port, 2947);
        assert_eq!(config.logging.log_dir, "/tmp/journeys");
        assert_eq!(config.fan.fan_gpio, 12);
        assert_eq!(config.fan.tach_gpio, 23);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.logging.grace_period_s, 120);
        assert_eq!(config.logging.log_interval_s, 10);
        assert!(config.diagnostics.log_file_dir.is_empty());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.gpsd.poll_interval_ms, 3000);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(JourneyLoggerError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml("[gpsd\nport = ");
        assert!(matches!(result, Err(JourneyLoggerError::Config(_))));
    }

    #[test]
    fn test_empty_gpsd_host() {
        let mut config = Config::default();
        config.gpsd.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_zero() {
        let mut config = Config::default();
        config.gpsd.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_drain_timeout_exceeds_poll_interval() {
        let mut config = Config::default();
        config.gpsd.drain_timeout_ms = config.gpsd.poll_interval_ms;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_drain_bounds() {
        let mut config = Config::default();
        config.gpsd.max_drain_ms = config.gpsd.drain_timeout_ms - 1;
        assert!(config.validate().is_err());

        config.gpsd.max_drain_ms = config.gpsd.poll_interval_ms;
        assert!(config.validate().is_err());

        config.gpsd.max_drain_ms = config.gpsd.drain_timeout_ms;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_log_dir() {
        let mut config = Config::default();
        config.logging.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_prefix_with_separator() {
        let mut config = Config::default();
        config.logging.file_prefix = "../escape".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_interval_zero() {
        let mut config = Config::default();
        config.logging.log_interval_s = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_grace_period_zero() {
        let mut config = Config::default();
        config.logging.grace_period_s = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_grace_period_too_high() {
        let mut config = Config::default();
        config.logging.grace_period_s = 86401;
        assert!(config.validate().is_err());

        // Values past i64 seconds would overflow the grace period
        config.logging.grace_period_s = u64::MAX;
        assert!(config.validate().is_err());

        config.logging.grace_period_s = 86400;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tach_gpio_outside_bank_one() {
        let mut config = Config::default();
        config.fan.tach_gpio = 32;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fan_and_tach_gpio_collide() {
        let mut config = Config::default();
        config.fan.tach_gpio = config.fan.fan_gpio;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_temperature_curve() {
        let mut config = Config::default();
        config.fan.temp_off_f = 160.0;
        config.fan.temp_full_f = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_temperature_curve() {
        let mut config = Config::default();
        config.fan.temp_full_f = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_control_interval_too_high() {
        let mut config = Config::default();
        config.fan.control_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_gpsd_host(), "127.0.0.1");
        assert_eq!(default_gpsd_port(), 2947);
        assert_eq!(default_poll_interval_ms(), 3000);
        assert_eq!(default_drain_timeout_ms(), 100);
        assert_eq!(default_max_drain_ms(), 1000);
        assert_eq!(default_log_dir(), "/home/pi/logs");
        assert_eq!(default_file_prefix(), "gps_log");
        assert_eq!(default_log_interval_s(), 10);
        assert_eq!(default_grace_period_s(), 120);
        assert_eq!(default_pigpio_host(), "127.0.0.1");
        assert_eq!(default_pigpio_port(), 8888);
        assert_eq!(default_fan_gpio(), 18);
        assert_eq!(default_tach_gpio(), 23);
        assert_eq!(default_control_interval_ms(), 2000);
        assert_eq!(default_temp_off_f(), 122.0);
        assert_eq!(default_temp_full_f(), 158.0);
        assert_eq!(default_temperature_path(), "/sys/class/thermal/thermal_zone0/temp");
    }
}
