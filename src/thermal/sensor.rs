//! # SoC Temperature Sensor
//!
//! Reads the Linux thermal zone exposed under `/sys/class/thermal`, which
//! reports millidegrees Celsius as a decimal integer.

use std::fs;
use std::path::{Path, PathBuf};

use super::TemperatureSensor;
use crate::error::{JourneyLoggerError, Result};

/// Thermal zone file reader.
#[derive(Debug, Clone)]
pub struct SysfsTemperatureSensor {
    path: PathBuf,
}

impl SysfsTemperatureSensor {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemperatureSensor for SysfsTemperatureSensor {
    fn read_fahrenheit(&mut self) -> Result<f64> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            JourneyLoggerError::Temperature(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let celsius = parse_millidegrees(&raw)?;
        Ok(celsius_to_fahrenheit(celsius))
    }
}

/// Parse a sysfs millidegree reading into °C.
pub fn parse_millidegrees(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let milli: i64 = trimmed.parse().map_err(|_| {
        JourneyLoggerError::Temperature(format!("Unexpected thermal zone value: {:?}", trimmed))
    })?;
    Ok(milli as f64 / 1000.0)
}

#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}
