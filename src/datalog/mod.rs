//! # Journey Data Log
//!
//! Session lifecycle and rate limiting around the two journey files.
//!
//! This module handles:
//! - Opening a KML route document and a CSV table per session
//! - Accepting at most one point per log interval
//! - Keeping the route document closed between writes
//! - Finalizing both files when the session stops
//!
//! File errors never escape: they are reported through `tracing` and the
//! engine carries on in whatever state it managed to reach.

pub mod route;
pub mod table;

use chrono::{DateTime, Local, TimeDelta};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::journey::fix::{FixQuality, FixReport, Position};
use route::RouteDocument;
use table::TabularLog;

/// File name timestamp, one-second resolution.
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Numbered suffixes tried when a session's file names are already taken.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// One journey point offered to the data log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogPoint {
    pub position: Position,
    /// Metres.
    pub altitude: f64,
    pub speed_mph: f64,
    pub satellites_seen: u32,
    pub satellites_used: u32,
    pub quality: FixQuality,
}

impl LogPoint {
    /// Build a point from a tick's report and its usable position.
    pub fn from_report(report: &FixReport, position: Position) -> Self {
        Self {
            position,
            altitude: report.altitude,
            speed_mph: report.speed_mph,
            satellites_seen: report.satellites_seen,
            satellites_used: report.satellites_used,
            quality: report.quality,
        }
    }
}

/// Session control surface driven by the journey tracker.
#[cfg_attr(test, mockall::automock)]
pub trait SessionLog {
    /// Whether a session is currently open.
    fn is_active(&self) -> bool;

    /// Open a new session. No-op while one is active.
    fn start_session(&mut self, now: DateTime<Local>);

    /// Offer a point. Returns true when it was written.
    fn record(&mut self, point: &LogPoint, now: DateTime<Local>) -> bool;

    /// Close the active session. No-op when inactive.
    fn stop_session(&mut self);

    /// Points written since the process started.
    fn logged_points(&self) -> u64;
}

/// Files and counters belonging to one open session.
#[derive(Debug)]
pub struct SessionState {
    route: RouteDocument,
    table: TabularLog,
    started_at: DateTime<Local>,
    points: u64,
}

impl SessionState {
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Points written during this session.
    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn route_path(&self) -> &Path {
        self.route.path()
    }

    pub fn table_path(&self) -> &Path {
        self.table.path()
    }

    /// Write the point to both files, or to neither.
    ///
    /// When either write fails both files are cut back to their previous
    /// length so the route and the table always hold the same points.
    fn append(&mut self, point: &LogPoint, now: DateTime<Local>) -> io::Result<()> {
        let route_len = self.route.byte_len()?;
        let table_len = self.table.byte_len()?;

        let written = self
            .route
            .append(point.position, point.altitude)
            .and_then(|()| self.table.append(point, now));

        if written.is_err() {
            if let Err(e) = self.route.truncate(route_len) {
                warn!("Could not roll back {}: {}", self.route.path().display(), e);
            }
            if let Err(e) = self.table.truncate(table_len) {
                warn!("Could not roll back {}: {}", self.table.path().display(), e);
            }
        }
        written
    }
}

/// Owns the journey files and decides which points reach them.
#[derive(Debug)]
pub struct LoggingEngine {
    log_dir: PathBuf,
    file_prefix: String,
    log_interval: TimeDelta,
    session: Option<SessionState>,
    last_logged: Option<DateTime<Local>>,
    logged_points: u64,
}

impl LoggingEngine {
    /// Create an engine writing under `log_dir`.
    ///
    /// The directory is created here if possible; a failure is only logged
    /// because every session start retries it.
    pub fn new<P: Into<PathBuf>>(log_dir: P, file_prefix: &str, log_interval: TimeDelta) -> Self {
        let log_dir = log_dir.into();
        if let Err(e) = fs::create_dir_all(&log_dir) {
            warn!("Could not create log directory {}: {}", log_dir.display(), e);
        }

        Self {
            log_dir,
            file_prefix: file_prefix.to_string(),
            log_interval,
            session: None,
            last_logged: None,
            logged_points: 0,
        }
    }

    /// The open session, if any.
    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Create the session's file pair without touching existing files.
    ///
    /// A taken name (clock stepped back, or a restart within the same
    /// second) moves on to `<name>_1`, `<name>_2` and so on.
    fn open_session(&self, now: DateTime<Local>) -> io::Result<SessionState> {
        fs::create_dir_all(&self.log_dir)?;

        let stem = format!("{}_{}", self.file_prefix, now.format(FILE_TIMESTAMP_FORMAT));
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let base = if attempt == 0 {
                stem.clone()
            } else {
                format!("{}_{}", stem, attempt)
            };
            let route_path = self.log_dir.join(format!("{}.kml", base));
            let table_path = self.log_dir.join(format!("{}.csv", base));
            if route_path.exists() || table_path.exists() {
                warn!("Session files {}.* already exist, trying another name", base);
                continue;
            }

            let route = match RouteDocument::create(&route_path) {
                Ok(route) => route,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };
            let table = match TabularLog::create(&table_path) {
                Ok(table) => table,
                Err(e) => {
                    // Drop the half-created pair
                    if let Err(rm) = fs::remove_file(&route_path) {
                        warn!("Could not remove {}: {}", route_path.display(), rm);
                    }
                    if e.kind() == io::ErrorKind::AlreadyExists {
                        continue;
                    }
                    return Err(e);
                }
            };

            return Ok(SessionState {
                route,
                table,
                started_at: now,
                points: 0,
            });
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free session file name for {}", stem),
        ))
    }

    fn rate_limited(&self, now: DateTime<Local>) -> bool {
        match self.last_logged {
            Some(last) => now - last < self.log_interval,
            None => false,
        }
    }
}

impl SessionLog for LoggingEngine {
    fn is_active(&self) -> bool {
        self.session.is_some()
    }

    fn start_session(&mut self, now: DateTime<Local>) {
        if self.session.is_some() {
            return;
        }

        match self.open_session(now) {
            Ok(session) => {
                info!(
                    "Logging session started: {} / {}",
                    session.route_path().display(),
                    session.table_path().display()
                );
                self.session = Some(session);
            }
            Err(e) => error!("Error starting logging session: {}", e),
        }
    }

    fn record(&mut self, point: &LogPoint, now: DateTime<Local>) -> bool {
        if self.rate_limited(now) {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        if let Err(e) = session.append(point, now) {
            error!("Error logging point, nothing recorded: {}", e);
            return false;
        }

        session.points += 1;
        self.logged_points += 1;
        self.last_logged = Some(now);
        true
    }

    fn stop_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if let Err(e) = session.route.finish() {
            error!("Error finalizing {}: {}", session.route.path().display(), e);
        }
        if let Err(e) = session.table.sync() {
            error!("Error finalizing {}: {}", session.table.path().display(), e);
        }

        info!(
            "Logging session stopped after {} points ({} total)",
            session.points, self.logged_points
        );
    }

    fn logged_points(&self) -> u64 {
        self.logged_points
    }
}
