//! # Thermal Control Loop
//!
//! Polls the temperature on a fixed cadence and drives the fan through the
//! [`FanCurve`]. The PWM output is only touched when the target duty changes.

use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::curve::FanCurve;
use super::{FanActuator, SharedThermal, TemperatureSensor};
use crate::error::Result;

/// Default control cadence.
pub const CONTROL_INTERVAL: Duration = Duration::from_secs(2);

/// Periodic temperature to fan duty regulator.
pub struct ThermalController<S, A> {
    sensor: S,
    fan: A,
    curve: FanCurve,
    shared: SharedThermal,
    period: Duration,
}

impl<S, A> std::fmt::Debug for ThermalController<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThermalController")
            .field("curve", &self.curve)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl<S: TemperatureSensor, A: FanActuator> ThermalController<S, A> {
    pub fn new(sensor: S, fan: A, curve: FanCurve, shared: SharedThermal, period: Duration) -> Self {
        Self {
            sensor,
            fan,
            curve,
            shared,
            period,
        }
    }

    /// Run one control cycle.
    ///
    /// Returns the duty cycle applied in this cycle, if it changed. A failed
    /// temperature read skips the cycle; a failed PWM write leaves the stored
    /// duty untouched so the next cycle tries again.
    pub async fn step(&mut self) -> Option<u8> {
        let temperature = match self.sensor.read_fahrenheit() {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping fan update: {}", e);
                return None;
            }
        };

        let target = self.curve.duty_for(temperature);
        let current = self.shared.update(|s| {
            s.temperature_f = Some(temperature);
            s.duty_cycle
        });
        if target == current {
            return None;
        }

        match self.fan.set_duty_cycle(target).await {
            Ok(()) => {
                self.shared.update(|s| s.duty_cycle = target);
                debug!("Fan duty {} -> {} at {:.1}°F", current, target, temperature);
                Some(target)
            }
            Err(e) => {
                warn!("Error setting fan speed: {}", e);
                None
            }
        }
    }

    /// Run control cycles until `stop` becomes true or its sender goes away.
    ///
    /// Hands the controller back so the caller can switch the fan off.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> Self {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Fan control loop running every {:?}", self.period);

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.step().await;
                }
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Fan control loop stopped");
        self
    }

    /// Drive the fan to zero and record it.
    pub async fn fan_off(&mut self) -> Result<()> {
        self.fan.set_duty_cycle(0).await?;
        self.shared.update(|s| s.duty_cycle = 0);
        Ok(())
    }

    pub fn fan(&self) -> &A {
        &self.fan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JourneyLoggerError;
    use crate::thermal::mocks::{RecordingFan, ScriptedSensor};

    fn controller(readings: Vec<Result<f64>>) -> (ThermalController<ScriptedSensor, RecordingFan>, RecordingFan, SharedThermal) {
        let fan = RecordingFan::new();
        let shared = SharedThermal::new();
        let controller = ThermalController::new(
            ScriptedSensor::new(readings),
            fan.clone(),
            FanCurve::default(),
            shared.clone(),
            CONTROL_INTERVAL,
        );
        (controller, fan, shared)
    }

    #[tokio::test]
    async fn test_anchor_readings_map_to_expected_duty() {
        let (mut ctl, fan, shared) =
            controller(vec![Ok(100.0), Ok(122.0), Ok(140.0), Ok(158.0), Ok(200.0)]);

        let mut duties = Vec::new();
        for _ in 0..5 {
            ctl.step().await;
            duties.push(shared.snapshot().duty_cycle);
        }

        assert_eq!(duties, vec![0, 0, 127, 255, 255]);
        // Only changes reach the PWM output
        assert_eq!(fan.applied(), vec![127, 255]);
    }

    #[tokio::test]
    async fn test_sensor_failure_skips_cycle() {
        let (mut ctl, fan, shared) = controller(vec![
            Ok(140.0),
            Err(JourneyLoggerError::Temperature("boom".to_string())),
        ]);

        assert_eq!(ctl.step().await, Some(127));
        assert_eq!(ctl.step().await, None);
        assert_eq!(shared.snapshot().duty_cycle, 127);
        assert_eq!(shared.snapshot().temperature_f, Some(140.0));
        assert_eq!(fan.applied(), vec![127]);
    }

    #[tokio::test]
    async fn test_actuator_failure_retries_next_cycle() {
        let (mut ctl, fan, shared) = controller(vec![Ok(160.0), Ok(160.0)]);

        fan.set_fail(true);
        assert_eq!(ctl.step().await, None);
        assert_eq!(shared.snapshot().duty_cycle, 0);

        fan.set_fail(false);
        assert_eq!(ctl.step().await, Some(255));
        assert_eq!(shared.snapshot().duty_cycle, 255);
    }

    #[tokio::test]
    async fn test_fan_off() {
        let (mut ctl, fan, shared) = controller(vec![Ok(200.0)]);
        ctl.step().await;
        ctl.fan_off().await.unwrap();

        assert_eq!(shared.snapshot().duty_cycle, 0);
        assert_eq!(fan.applied(), vec![255, 0]);
        assert_eq!(ctl.fan().applied(), vec![255, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_stopped() {
        let (ctl, fan, shared) =
            controller(vec![Ok(100.0), Ok(130.0), Ok(130.0), Ok(160.0)]);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(ctl.run(stop_rx));
        // Ticks at 0s, 2s, 4s and 6s
        tokio::time::sleep(Duration::from_secs(7)).await;
        stop_tx.send(true).unwrap();
        let ctl = handle.await.unwrap();

        assert_eq!(fan.applied(), vec![56, 255]);
        assert_eq!(shared.snapshot().duty_cycle, 255);
        assert_eq!(ctl.fan().applied(), vec![56, 255]);
    }

    #[tokio::test]
    async fn test_run_exits_immediately_when_already_stopped() {
        let (ctl, fan, _shared) = controller(vec![Ok(200.0)]);
        let (_stop_tx, stop_rx) = watch::channel(true);

        ctl.run(stop_rx).await;
        assert!(fan.applied().is_empty());
    }

    #[tokio::test]
    async fn test_run_exits_when_sender_dropped() {
        let (ctl, _fan, _shared) = controller(vec![Ok(100.0)]);
        let (stop_tx, stop_rx) = watch::channel(false);
        drop(stop_tx);

        tokio::time::timeout(Duration::from_secs(5), ctl.run(stop_rx))
            .await
            .expect("control loop should stop when the stop sender is dropped");
    }
}
