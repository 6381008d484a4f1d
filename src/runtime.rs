//! # Main Polling Loop
//!
//! Drives one tick per poll interval: read the fix source, advance the
//! journey tracker (which feeds the logging engine) and refresh the status
//! display. Also owns the shutdown routine run from every exit path.
//!
//! A panic inside a tick is caught and returned as an error so the shutdown
//! routine still closes the session and stops the fan.

use chrono::Local;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::datalog::{LoggingEngine, SessionLog};
use crate::display::{StatusDisplay, StatusSnapshot};
use crate::error::{JourneyLoggerError, Result};
use crate::gpsd::FixSource;
use crate::journey::{JourneyTracker, TickOutcome};
use crate::shutdown::Shutdown;
use crate::thermal::controller::ThermalController;
use crate::thermal::{FanActuator, SharedThermal, TemperatureSensor};

/// Default polling cadence
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// How long shutdown waits for the fan control task to hand back the fan
pub const THERMAL_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Foreground loop state
pub struct MainLoop<F, D> {
    source: F,
    display: D,
    tracker: JourneyTracker,
    logger: LoggingEngine,
    thermal: SharedThermal,
    period: Duration,
}

impl<F: FixSource, D: StatusDisplay> MainLoop<F, D> {
    pub fn new(
        source: F,
        display: D,
        tracker: JourneyTracker,
        logger: LoggingEngine,
        thermal: SharedThermal,
        period: Duration,
    ) -> Self {
        Self {
            source,
            display,
            tracker,
            logger,
            thermal,
            period,
        }
    }

    /// Run one polling tick
    ///
    /// # Errors
    ///
    /// Only a failing fix source is an error; display problems are logged.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let report = self.source.next_report().await?;
        let now = Local::now();

        let outcome = self.tracker.tick(&report, &mut self.logger, now);

        let status = StatusSnapshot::collect(
            &report,
            &self.tracker,
            &self.logger,
            self.thermal.snapshot(),
            now,
        );
        if let Err(e) = self.display.render(&status) {
            warn!("Display update failed: {}", e);
        }

        Ok(outcome)
    }

    /// Tick until `signal` resolves or a tick fails
    ///
    /// Returns the name of the signal that ended the loop. A tick that
    /// panics ends the loop with [`JourneyLoggerError::Panicked`].
    pub async fn run<S>(&mut self, signal: S) -> Result<&'static str>
    where
        S: Future<Output = &'static str>,
    {
        tokio::pin!(signal);
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Polling fix source every {:?}", self.period);

        loop {
            tokio::select! {
                name = &mut signal => return Ok(name),
                _ = ticker.tick() => {}
            }

            tokio::select! {
                name = &mut signal => return Ok(name),
                result = AssertUnwindSafe(self.tick()).catch_unwind() => match result {
                    Ok(tick) => {
                        tick?;
                    }
                    Err(payload) => {
                        return Err(JourneyLoggerError::Panicked(panic_message(&*payload)));
                    }
                },
            }
        }
    }

    /// Stop logging, switch the fan off and put the display to sleep.
    ///
    /// Only the first call does anything; it returns false afterwards.
    pub async fn shutdown<S, A>(
        &mut self,
        shutdown: &Shutdown,
        thermal_task: &mut Option<JoinHandle<ThermalController<S, A>>>,
    ) -> bool
    where
        S: TemperatureSensor,
        A: FanActuator,
    {
        if !shutdown.begin() {
            return false;
        }
        info!("Shutting down...");

        self.logger.stop_session();

        if let Some(task) = thermal_task.take() {
            match timeout(THERMAL_STOP_TIMEOUT, task).await {
                Ok(Ok(mut controller)) => match controller.fan_off().await {
                    Ok(()) => info!("Fan off"),
                    Err(e) => error!("Failed to switch fan off: {}", e),
                },
                Ok(Err(e)) => error!("Fan control task failed: {}", e),
                Err(_) => error!("Fan control task did not stop within {:?}", THERMAL_STOP_TIMEOUT),
            }
        }

        if let Err(e) = self.display.sleep() {
            warn!("Display sleep failed: {}", e);
        }

        info!("Total points logged: {}", self.logger.logged_points());
        true
    }

    pub fn tracker(&self) -> &JourneyTracker {
        &self.tracker
    }

    pub fn logger(&self) -> &LoggingEngine {
        &self.logger
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
