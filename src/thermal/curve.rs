//! # Fan Curve
//!
//! Piecewise-linear temperature to PWM duty mapping:
//!
//! ```text
//! duty
//!  255 ┤               ┌──────
//!      │              ╱
//!      │            ╱
//!    0 ┼──────────┘
//!      └──────────┬────┬──────── °F
//!                122  158
//! ```

/// Maximum PWM duty cycle.
pub const DUTY_MAX: u8 = 255;

/// Temperature to duty cycle mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanCurve {
    /// Fan is off strictly below this temperature (°F).
    off_below_f: f64,
    /// Fan runs flat out at and above this temperature (°F).
    full_at_f: f64,
}

impl Default for FanCurve {
    fn default() -> Self {
        Self {
            off_below_f: 122.0,
            full_at_f: 158.0,
        }
    }
}

impl FanCurve {
    /// Build a curve ramping between two temperatures.
    ///
    /// Callers must pass `off_below_f < full_at_f`; configuration validation
    /// enforces this.
    #[must_use]
    pub fn new(off_below_f: f64, full_at_f: f64) -> Self {
        Self { off_below_f, full_at_f }
    }

    /// Duty cycle for a temperature in °F.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_logger::thermal::curve::FanCurve;
    ///
    /// let curve = FanCurve::default();
    /// assert_eq!(curve.duty_for(100.0), 0);
    /// assert_eq!(curve.duty_for(140.0), 127);
    /// assert_eq!(curve.duty_for(158.0), 255);
    /// ```
    #[must_use]
    pub fn duty_for(&self, temperature_f: f64) -> u8 {
        if temperature_f < self.off_below_f {
            return 0;
        }
        if temperature_f >= self.full_at_f {
            return DUTY_MAX;
        }

        let fraction = (temperature_f - self.off_below_f) / (self.full_at_f - self.off_below_f);
        // Truncate toward zero like an integer cast of the scaled value
        (fraction * f64::from(DUTY_MAX)) as u8
    }
}

/// Fan speed as a percentage of full duty.
#[must_use]
pub fn duty_percent(duty: u8) -> f64 {
    f64::from(duty) / (f64::from(DUTY_MAX) / 100.0)
}
