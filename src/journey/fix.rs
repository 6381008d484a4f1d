//! # Fix Report Types
//!
//! One polling tick's view of the satellite receiver.

use std::fmt;

/// Satellite positioning confidence, as reported in the gpsd `mode` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixQuality {
    /// Receiver has no position solution (mode 1).
    #[default]
    NoFix,
    /// Horizontal position only (mode 2).
    Fix2D,
    /// Horizontal position and altitude (mode 3).
    Fix3D,
    /// Mode not reported or not recognised (mode 0 or anything else).
    Unknown,
}

impl FixQuality {
    /// Map a gpsd `mode` value onto a fix quality.
    pub fn from_mode(mode: i64) -> Self {
        match mode {
            1 => FixQuality::NoFix,
            2 => FixQuality::Fix2D,
            3 => FixQuality::Fix3D,
            _ => FixQuality::Unknown,
        }
    }

    /// gpsd `mode` number written to the CSV `Fix Status` column.
    pub fn mode(self) -> u8 {
        match self {
            FixQuality::Unknown => 0,
            FixQuality::NoFix => 1,
            FixQuality::Fix2D => 2,
            FixQuality::Fix3D => 3,
        }
    }

    /// True for 2D and 3D fixes.
    pub fn has_position(self) -> bool {
        matches!(self, FixQuality::Fix2D | FixQuality::Fix3D)
    }

    /// Short label shown on the status display.
    pub fn label(self) -> &'static str {
        match self {
            FixQuality::NoFix => "No Fix",
            FixQuality::Fix2D => "2D Fix",
            FixQuality::Fix3D => "3D Fix",
            FixQuality::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FixQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Sensor snapshot for one polling tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixReport {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Metres.
    pub altitude: f64,
    /// Miles per hour.
    pub speed_mph: f64,
    pub satellites_seen: u32,
    pub satellites_used: u32,
    pub quality: FixQuality,
}

impl FixReport {
    /// Position of a usable fix: 2D or 3D quality with both coordinates.
    ///
    /// A dropped coordinate on an otherwise good fix yields `None`, the same
    /// as an explicit loss of fix.
    pub fn usable_position(&self) -> Option<Position> {
        if !self.quality.has_position() {
            return None;
        }
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Position::new(lat, lon)),
            _ => None,
        }
    }
}
