//! # pigpio Response and Notification Decoder

use super::protocol::*;
use crate::error::{JourneyLoggerError, Result};

/// Decode a command response and return its raw `p3` field
///
/// # Errors
///
/// Returns error if the response is short or echoes a different command
pub fn decode_response_raw(expected_cmd: u32, response: &[u8]) -> Result<u32> {
    if response.len() < PIGPIO_COMMAND_SIZE {
        return Err(JourneyLoggerError::Pigpio(
            format!("Response too short: {} bytes", response.len())
        ));
    }

    let cmd = u32::from_le_bytes([response[0], response[1], response[2], response[3]]);
    if cmd != expected_cmd {
        return Err(JourneyLoggerError::Pigpio(
            format!("Response for command {} while waiting for {}", cmd, expected_cmd)
        ));
    }

    Ok(u32::from_le_bytes([response[12], response[13], response[14], response[15]]))
}

/// Decode a command response whose result is a status or handle
///
/// # Errors
///
/// Returns [`JourneyLoggerError::PigpioCommand`] for negative results
pub fn decode_response(expected_cmd: u32, response: &[u8]) -> Result<u32> {
    let raw = decode_response_raw(expected_cmd, response)?;
    let status = raw as i32;
    if status < 0 {
        return Err(JourneyLoggerError::PigpioCommand {
            command: expected_cmd,
            code: status,
        });
    }
    Ok(raw)
}

/// Decode one 12-byte notification report
pub fn decode_report(bytes: &[u8]) -> Result<Report> {
    if bytes.len() < PIGPIO_REPORT_SIZE {
        return Err(JourneyLoggerError::Pigpio(
            format!("Report too short: {} bytes", bytes.len())
        ));
    }

    Ok(Report {
        seqno: u16::from_le_bytes([bytes[0], bytes[1]]),
        flags: u16::from_le_bytes([bytes[2], bytes[3]]),
        tick: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        level: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
    })
}

/// Turns level reports for one GPIO into falling-edge ticks
#[derive(Debug, Clone, Copy)]
pub struct EdgeDetector {
    mask: u32,
    high: bool,
}

impl EdgeDetector {
    /// `initial_levels` is a bank 1 level read taken before notifications began
    pub fn new(gpio: u32, initial_levels: u32) -> Self {
        let mask = gpio_mask(gpio);
        Self {
            mask,
            high: initial_levels & mask != 0,
        }
    }

    /// Tick of a 1→0 transition carried by `report`, if any
    pub fn falling_edge(&mut self, report: &Report) -> Option<u32> {
        // Watchdog, keep-alive and event reports carry no level change
        if report.flags != 0 {
            return None;
        }

        let high = report.level & self.mask != 0;
        let fell = self.high && !high;
        self.high = high;
        fell.then_some(report.tick)
    }
}
