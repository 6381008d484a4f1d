//! # Error Types
//!
//! Custom error types for Journey Logger using `thiserror`.

use thiserror::Error;

/// Main error type for Journey Logger
#[derive(Debug, Error)]
pub enum JourneyLoggerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// gpsd protocol errors (connection lost, unexpected stream contents)
    #[error("gpsd error: {0}")]
    Gpsd(String),

    /// Malformed gpsd JSON report
    #[error("gpsd report error: {0}")]
    GpsdReport(#[from] serde_json::Error),

    /// pigpio daemon rejected a command
    #[error("pigpio command {command} failed with code {code}")]
    PigpioCommand {
        /// Command number that was sent
        command: u32,
        /// Negative status returned by the daemon
        code: i32,
    },

    /// pigpio protocol errors (unreachable daemon, malformed replies)
    #[error("pigpio error: {0}")]
    Pigpio(String),

    /// Temperature sensor read failures
    #[error("Temperature sensor error: {0}")]
    Temperature(String),

    /// A polling tick panicked
    #[error("Polling tick panicked: {0}")]
    Panicked(String),
}

/// Result type alias for Journey Logger
pub type Result<T> = std::result::Result<T, JourneyLoggerError>;
