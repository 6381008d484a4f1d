//! # Journey Module
//!
//! Fix-lifecycle state machine: decides when a journey is being logged.
//!
//! ```text
//!               usable fix
//!  AwaitingFix ────────────► Tracking ◄──────────┐
//!       ▲                      │                 │ usable fix
//!       │                      │ fix lost        │ (within grace)
//!       │   grace expired      ▼                 │
//!       └──────────────── FixLostGrace ──────────┘
//! ```
//!
//! A fix is usable when its quality is 2D or 3D and both coordinates are
//! present. Entering `AwaitingFix` from an expired grace period closes the
//! logging session; a usable fix always (re)opens it.

pub mod distance;
pub mod fix;

use chrono::{DateTime, Local, TimeDelta};
use tracing::info;

use crate::datalog::{LogPoint, SessionLog};
use distance::accumulate;
use fix::{FixReport, Position};

/// Where the tracker is in the fix lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixState {
    /// No usable fix, no session expected.
    AwaitingFix,
    /// Usable fix, session open.
    Tracking,
    /// Fix lost at `lost_at`; session kept open until the grace period ends.
    FixLostGrace { lost_at: DateTime<Local> },
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still waiting for a usable fix.
    Waiting,
    /// Usable fix processed; `logged` tells whether the data log accepted it.
    Tracked { logged: bool },
    /// Fix just lost, grace period started.
    FixLost,
    /// Fix still lost, grace period running.
    InGrace,
    /// Grace period expired; session stopped.
    SessionEnded,
}

/// Persistent journey state across polling ticks.
#[derive(Debug, Clone)]
pub struct JourneyTracker {
    state: FixState,
    grace_period: TimeDelta,
    fix_acquired_at: Option<DateTime<Local>>,
    last_position: Option<Position>,
    home: Option<Position>,
    distance_miles: f64,
}

impl JourneyTracker {
    pub fn new(grace_period: TimeDelta) -> Self {
        Self {
            state: FixState::AwaitingFix,
            grace_period,
            fix_acquired_at: None,
            last_position: None,
            home: None,
            distance_miles: 0.0,
        }
    }

    pub fn state(&self) -> FixState {
        self.state
    }

    /// Time the first usable fix arrived (journey start).
    pub fn fix_acquired_at(&self) -> Option<DateTime<Local>> {
        self.fix_acquired_at
    }

    /// Time the current fix loss began, while in the grace period.
    pub fn fix_lost_at(&self) -> Option<DateTime<Local>> {
        match self.state {
            FixState::FixLostGrace { lost_at } => Some(lost_at),
            _ => None,
        }
    }

    pub fn last_position(&self) -> Option<Position> {
        self.last_position
    }

    /// First usable position; never changes once set.
    pub fn home(&self) -> Option<Position> {
        self.home
    }

    /// Cumulative distance in statute miles.
    pub fn distance_miles(&self) -> f64 {
        self.distance_miles
    }

    /// Minutes since the journey start, 0 before any fix.
    pub fn minutes_since_fix(&self, now: DateTime<Local>) -> f64 {
        match self.fix_acquired_at {
            Some(at) => (now - at).num_milliseconds() as f64 / 60_000.0,
            None => 0.0,
        }
    }

    /// Advance the state machine by one polling tick.
    pub fn tick<L: SessionLog + ?Sized>(
        &mut self,
        report: &FixReport,
        log: &mut L,
        now: DateTime<Local>,
    ) -> TickOutcome {
        match (report.usable_position(), self.state) {
            (Some(position), state) => {
                match state {
                    FixState::AwaitingFix => info!("GPS fix acquired"),
                    FixState::FixLostGrace { .. } => info!("GPS fix regained"),
                    FixState::Tracking => {}
                }
                self.state = FixState::Tracking;
                let logged = self.track(report, position, log, now);
                TickOutcome::Tracked { logged }
            }
            (None, FixState::AwaitingFix) => TickOutcome::Waiting,
            (None, FixState::Tracking) => {
                info!("GPS fix lost");
                self.state = FixState::FixLostGrace { lost_at: now };
                TickOutcome::FixLost
            }
            (None, FixState::FixLostGrace { lost_at }) => {
                if now - lost_at < self.grace_period {
                    return TickOutcome::InGrace;
                }
                if log.is_active() {
                    log.stop_session();
                    info!("Logging stopped due to extended GPS fix loss");
                }
                self.state = FixState::AwaitingFix;
                TickOutcome::SessionEnded
            }
        }
    }

    fn track<L: SessionLog + ?Sized>(
        &mut self,
        report: &FixReport,
        position: Position,
        log: &mut L,
        now: DateTime<Local>,
    ) -> bool {
        if self.home.is_none() {
            self.home = Some(position);
            self.fix_acquired_at = Some(now);
            info!(
                "Home position set to {:.6}, {:.6}",
                position.latitude, position.longitude
            );
        }

        if !log.is_active() {
            log.start_session(now);
        }

        if let Some(last) = self.last_position {
            self.distance_miles += accumulate(last, position);
        }
        self.last_position = Some(position);

        log.record(&LogPoint::from_report(report, position), now)
    }
}
