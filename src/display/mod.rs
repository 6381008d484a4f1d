//! # Status Display Module
//!
//! Builds the status screen shown each polling tick and hands it to a
//! [`StatusDisplay`]. The shipped renderer writes the screen to the log
//! through `tracing`; hardware panels plug in behind the same trait.

use chrono::{DateTime, Local};
use tracing::info;

use crate::datalog::SessionLog;
use crate::error::Result;
use crate::journey::fix::{FixQuality, FixReport};
use crate::journey::JourneyTracker;
use crate::thermal::curve::duty_percent;
use crate::thermal::ThermalState;

const JOURNEY_START_FORMAT: &str = "%I:%M:%S %p";
const DATE_TIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Everything shown on one status screen
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub quality: FixQuality,
    pub satellites_seen: u32,
    pub satellites_used: u32,
    pub speed_mph: f64,
    pub altitude: f64,
    pub distance_miles: f64,
    pub minutes_since_fix: f64,
    pub logging: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub logged_points: u64,
    pub journey_start: Option<DateTime<Local>>,
    pub now: DateTime<Local>,
    pub duty_cycle: u8,
    pub temperature_f: Option<f64>,
}

impl StatusSnapshot {
    pub fn collect<L: SessionLog + ?Sized>(
        report: &FixReport,
        tracker: &JourneyTracker,
        log: &L,
        thermal: ThermalState,
        now: DateTime<Local>,
    ) -> Self {
        let position = report.latitude.zip(report.longitude);
        Self {
            quality: report.quality,
            satellites_seen: report.satellites_seen,
            satellites_used: report.satellites_used,
            speed_mph: report.speed_mph,
            altitude: report.altitude,
            distance_miles: tracker.distance_miles(),
            minutes_since_fix: tracker.minutes_since_fix(now),
            logging: log.is_active(),
            latitude: position.map(|(lat, _)| lat),
            longitude: position.map(|(_, lon)| lon),
            logged_points: log.logged_points(),
            journey_start: tracker.fix_acquired_at(),
            now,
            duty_cycle: thermal.duty_cycle,
            temperature_f: thermal.temperature_f,
        }
    }

    /// Screen text, left column then right column
    pub fn lines(&self) -> Vec<String> {
        let coordinate = |value: Option<f64>| match value {
            Some(v) => format!("{:.6}", v),
            None => "N/A".to_string(),
        };

        vec![
            format!("Fix: {}", self.quality),
            format!("Sats Seen: {}", self.satellites_seen),
            format!("Sats Used: {}", self.satellites_used),
            format!("Speed: {:.2} mph", self.speed_mph),
            format!("Altitude: {:.0} m", self.altitude),
            format!("Dist: {:.2} mi", self.distance_miles),
            format!("LastFix: {:.1} min", self.minutes_since_fix),
            format!("Logging: {}", if self.logging { "ON" } else { "OFF" }),
            format!("Lat: {}", coordinate(self.latitude)),
            format!("Lon: {}", coordinate(self.longitude)),
            format!("Logged Points: {}", self.logged_points),
            "Journey Start:".to_string(),
            self.journey_start
                .map(|t| t.format(JOURNEY_START_FORMAT).to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            self.now.format(DATE_TIME_FORMAT).to_string(),
            format!("Fan Speed: {:.0}%", duty_percent(self.duty_cycle)),
            match self.temperature_f {
                Some(t) => format!("CPU Temp: {:.1}°F", t),
                None => "CPU Temp: N/A".to_string(),
            },
        ]
    }
}

/// Output surface for status screens
pub trait StatusDisplay: Send {
    fn render(&mut self, status: &StatusSnapshot) -> Result<()>;

    /// Put the panel into its low-power state before exit
    fn sleep(&mut self) -> Result<()>;
}

/// Renders status screens as a single `tracing` event
#[derive(Debug, Default)]
pub struct TracingDisplay {
    asleep: bool,
}

impl TracingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }
}

impl StatusDisplay for TracingDisplay {
    fn render(&mut self, status: &StatusSnapshot) -> Result<()> {
        if !self.asleep {
            info!(target: "status", "{}", status.lines().join(" | "));
        }
        Ok(())
    }

    fn sleep(&mut self) -> Result<()> {
        self.asleep = true;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalog::MockSessionLog;
    use chrono::{TimeDelta, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    fn idle_log(active: bool, points: u64) -> MockSessionLog {
        let mut log = MockSessionLog::new();
        log.expect_is_active().return_const(active);
        log.expect_logged_points().return_const(points);
        log
    }

    #[test]
    fn test_lines_without_fix() {
        let tracker = JourneyTracker::new(TimeDelta::seconds(120));
        let status = StatusSnapshot::collect(
            &FixReport::default(),
            &tracker,
            &idle_log(false, 0),
            ThermalState::default(),
            at(14, 5, 9),
        );

        assert_eq!(
            status.lines(),
            vec![
                "Fix: No Fix",
                "Sats Seen: 0",
                "Sats Used: 0",
                "Speed: 0.00 mph",
                "Altitude: 0 m",
                "Dist: 0.00 mi",
                "LastFix: 0.0 min",
                "Logging: OFF",
                "Lat: N/A",
                "Lon: N/A",
                "Logged Points: 0",
                "Journey Start:",
                "N/A",
                "05/01/2024 02:05:09 PM",
                "Fan Speed: 0%",
                "CPU Temp: N/A",
            ]
        );
    }

    #[test]
    fn test_lines_while_tracking() {
        let mut tracker = JourneyTracker::new(TimeDelta::seconds(120));
        let report = FixReport {
            latitude: Some(40.123456789),
            longitude: Some(-75.5),
            altitude: 123.6,
            speed_mph: 31.234,
            satellites_seen: 12,
            satellites_used: 8,
            quality: FixQuality::Fix3D,
        };

        let mut log = MockSessionLog::new();
        log.expect_is_active().return_const(true);
        log.expect_record().return_const(true);
        log.expect_logged_points().return_const(7u64);
        tracker.tick(&report, &mut log, at(9, 0, 0));

        let thermal = ThermalState {
            duty_cycle: 127,
            temperature_f: Some(140.04),
            ..ThermalState::default()
        };
        let lines = StatusSnapshot::collect(&report, &tracker, &log, thermal, at(9, 1, 30)).lines();

        assert_eq!(lines[0], "Fix: 3D Fix");
        assert_eq!(lines[3], "Speed: 31.23 mph");
        assert_eq!(lines[4], "Altitude: 124 m");
        assert_eq!(lines[6], "LastFix: 1.5 min");
        assert_eq!(lines[7], "Logging: ON");
        assert_eq!(lines[8], "Lat: 40.123457");
        assert_eq!(lines[9], "Lon: -75.500000");
        assert_eq!(lines[10], "Logged Points: 7");
        assert_eq!(lines[12], "09:00:00 AM");
        assert_eq!(lines[14], "Fan Speed: 50%");
        assert_eq!(lines[15], "CPU Temp: 140.0°F");
    }

    #[test]
    fn test_tracing_display_sleep() {
        let mut display = TracingDisplay::new();
        let status = StatusSnapshot::collect(
            &FixReport::default(),
            &JourneyTracker::new(TimeDelta::seconds(120)),
            &idle_log(false, 0),
            ThermalState::default(),
            at(12, 0, 0),
        );

        assert!(display.render(&status).is_ok());
        display.sleep().unwrap();
        assert!(display.is_asleep());
        assert!(display.render(&status).is_ok());
    }
}
