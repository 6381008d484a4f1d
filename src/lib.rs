//! # Journey Logger Library
//!
//! Always-on GPS journey logger with tachometer-monitored fan control.
//!
//! This library provides the core functionality for deciding when a journey
//! is active from gpsd fix reports, recording it as KML and CSV, and keeping
//! the enclosure cool through the pigpio daemon.

pub mod config;
pub mod datalog;
pub mod display;
pub mod error;
pub mod gpsd;
pub mod journey;
pub mod pigpio;
pub mod runtime;
pub mod shutdown;
pub mod thermal;
