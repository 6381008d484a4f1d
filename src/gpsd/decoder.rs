//! # gpsd Stream Decoder
//!
//! Splits the gpsd byte stream into lines and folds the reports of one
//! polling tick into a [`FixReport`].

use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use super::protocol::*;
use crate::error::Result;
use crate::journey::fix::{FixQuality, FixReport};

/// Accumulates bytes and yields complete newline-terminated lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer that `AsyncReadExt::read_buf` fills
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Next complete line without its terminator, if one is buffered
    ///
    /// Invalid UTF-8 is replaced. A partial line that grows past
    /// [`MAX_LINE_LENGTH`] is discarded.
    pub fn next_line(&mut self) -> Option<String> {
        match self.buffer.iter().position(|&b| b == b'\n') {
            Some(end) => {
                let line = self.buffer.split_to(end + 1);
                let text = String::from_utf8_lossy(&line[..end]);
                Some(text.trim_end_matches('\r').to_string())
            }
            None => {
                if self.buffer.len() > MAX_LINE_LENGTH {
                    warn!("Discarding {} bytes of unterminated gpsd data", self.buffer.len());
                    self.buffer.advance(self.buffer.len());
                }
                None
            }
        }
    }
}

/// Decode one gpsd line
pub fn decode_line(line: &str) -> Result<GpsdReport> {
    Ok(serde_json::from_str(line)?)
}

/// Folds the reports drained during one tick into a [`FixReport`]
///
/// Starts from "no fix, nothing seen" every tick. The latest TPV and SKY
/// reports win.
#[derive(Debug, Default)]
pub struct FixAccumulator {
    report: FixReport,
    reports_seen: usize,
}

impl FixAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one report in
    pub fn apply(&mut self, report: GpsdReport) {
        self.reports_seen += 1;
        match report {
            GpsdReport::Tpv(tpv) => {
                self.report.latitude = tpv.lat;
                self.report.longitude = tpv.lon;
                self.report.speed_mph = tpv.speed_mph().unwrap_or(0.0);
                self.report.altitude = tpv.altitude().unwrap_or(0.0);
                self.report.quality = FixQuality::from_mode(tpv.mode.unwrap_or(1));
            }
            GpsdReport::Sky(sky) => {
                let (seen, used) = sky.counts();
                self.report.satellites_seen = seen;
                self.report.satellites_used = used;
                for sat in sky.satellites.iter().flatten() {
                    debug!(
                        "Satellite PRN {:?}: el {:?} az {:?} ss {:?} used {}",
                        sat.prn,
                        sat.el,
                        sat.az,
                        sat.ss,
                        if sat.used { "Y" } else { "N" }
                    );
                }
            }
            GpsdReport::Other => {}
        }
    }

    /// Reports folded in so far, including ignored classes
    pub fn reports_seen(&self) -> usize {
        self.reports_seen
    }

    pub fn finish(self) -> FixReport {
        debug!(
            "Fix status {}, lat {:?}, lon {:?}, sats {}/{}, speed {:.2} mph",
            self.report.quality.mode(),
            self.report.latitude,
            self.report.longitude,
            self.report.satellites_seen,
            self.report.satellites_used,
            self.report.speed_mph
        );
        self.report
    }
}
