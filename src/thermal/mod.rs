//! # Thermal Module
//!
//! CPU temperature driven fan control with tachometer feedback.
//!
//! This module handles:
//! - Mapping temperature to a PWM duty cycle ([`curve`])
//! - Counting tachometer edges into an RPM estimate ([`tach`])
//! - Running the periodic control loop ([`controller`])
//! - Reading the SoC temperature from sysfs ([`sensor`])
//!
//! [`ThermalState`] is the only state shared between execution contexts. It
//! lives behind a single mutex in [`SharedThermal`] so the tachometer task and
//! the control loop always see a consistent snapshot.

pub mod controller;
pub mod curve;
pub mod sensor;
pub mod tach;

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;

/// Fan and tachometer state shared across tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThermalState {
    /// Duty cycle currently applied to the fan (0-255).
    pub duty_cycle: u8,
    /// Last measured fan speed.
    pub rpm: f64,
    /// Tick (µs) of the edge that completed the last revolution.
    pub last_edge_tick: u32,
    /// Falling edges seen in the current revolution (0 or 1).
    pub edge_count: u8,
    /// Most recent successful temperature reading (°F).
    pub temperature_f: Option<f64>,
}

/// Handle to the shared [`ThermalState`].
#[derive(Debug, Clone, Default)]
pub struct SharedThermal {
    inner: Arc<Mutex<ThermalState>>,
}

impl SharedThermal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of the whole state.
    pub fn snapshot(&self) -> ThermalState {
        *self.lock()
    }

    /// Run `f` with exclusive access to the state.
    ///
    /// The lock is never held across an await point.
    pub fn update<R>(&self, f: impl FnOnce(&mut ThermalState) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, ThermalState> {
        // Plain data: a poisoned lock still holds a usable state
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Source of the temperature that drives the fan curve.
pub trait TemperatureSensor: Send {
    /// Current temperature in °F.
    fn read_fahrenheit(&mut self) -> Result<f64>;
}

/// PWM output driving the fan.
#[async_trait]
pub trait FanActuator: Send {
    /// Apply a duty cycle in 0-255.
    async fn set_duty_cycle(&mut self, duty: u8) -> Result<()>;
}
