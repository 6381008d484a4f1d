//! # Tachometer Pulse Counter
//!
//! The fan's tach line pulls low twice per revolution. Every second falling
//! edge closes a revolution and the time since the previous one gives RPM.
//!
//! Edge ticks are the pigpio microsecond counter, which wraps every ~72
//! minutes; elapsed time is computed with wrapping subtraction.

use super::SharedThermal;

/// Falling edges per fan revolution.
pub const EDGES_PER_REVOLUTION: u8 = 2;

/// Microseconds per minute, the numerator of the RPM estimate.
const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// Writes tachometer measurements into the shared thermal state.
#[derive(Debug, Clone)]
pub struct PulseCounter {
    shared: SharedThermal,
}

impl PulseCounter {
    pub fn new(shared: SharedThermal) -> Self {
        Self { shared }
    }

    /// Handle one falling edge observed at `tick_us`.
    ///
    /// Returns the new RPM when this edge completed a revolution.
    pub fn on_falling_edge(&self, tick_us: u32) -> Option<f64> {
        self.shared.update(|state| {
            state.edge_count += 1;
            if state.edge_count < EDGES_PER_REVOLUTION {
                return None;
            }

            let elapsed = tick_us.wrapping_sub(state.last_edge_tick);
            state.rpm = rpm_from_elapsed(elapsed);
            state.edge_count = 0;
            state.last_edge_tick = tick_us;
            Some(state.rpm)
        })
    }
}

/// RPM for one revolution lasting `elapsed_us`; 0 for a zero interval.
#[must_use]
pub fn rpm_from_elapsed(elapsed_us: u32) -> f64 {
    if elapsed_us == 0 {
        0.0
    } else {
        MICROS_PER_MINUTE / f64::from(elapsed_us)
    }
}
