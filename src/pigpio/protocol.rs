//! # pigpio Socket Protocol Constants and Types
//!
//! Core definitions for talking to the pigpio daemon (`pigpiod`) over TCP.
//!
//! Every command is a 16-byte little-endian message `cmd, p1, p2, p3` where
//! `p3` is the length of an optional extension (always 0 here). The daemon
//! echoes `cmd, p1, p2` and puts the result in `p3`; negative results are
//! pigpio error codes.

/// Default pigpiod port
pub const PIGPIO_DEFAULT_PORT: u16 = 8888;

/// Set GPIO mode
pub const PI_CMD_MODES: u32 = 0;

/// Set GPIO pull-up/down
pub const PI_CMD_PUD: u32 = 2;

/// Start PWM with the given duty cycle
pub const PI_CMD_PWM: u32 = 5;

/// Read levels of GPIO 0-31
pub const PI_CMD_BR1: u32 = 10;

/// Begin notifications on a handle for a GPIO bitmask
pub const PI_CMD_NB: u32 = 19;

/// Open an in-band notification stream on the issuing socket
pub const PI_CMD_NOIB: u32 = 99;

/// GPIO input mode
pub const PI_INPUT: u32 = 0;

/// Pull-up resistor setting
pub const PI_PUD_UP: u32 = 2;

/// Command and response message size
pub const PIGPIO_COMMAND_SIZE: usize = 16;

/// Notification report size
pub const PIGPIO_REPORT_SIZE: usize = 12;

/// Report flag: watchdog timeout
pub const PI_NTFY_FLAGS_WDOG: u16 = 1 << 5;

/// Report flag: keep-alive
pub const PI_NTFY_FLAGS_ALIVE: u16 = 1 << 6;

/// Highest GPIO covered by bank 1 notifications
pub const PI_MAX_BANK1_GPIO: u32 = 31;

/// One outgoing command (the extension length is always zero)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub cmd: u32,
    pub p1: u32,
    pub p2: u32,
}

impl Command {
    pub fn new(cmd: u32, p1: u32, p2: u32) -> Self {
        Self { cmd, p1, p2 }
    }
}

/// One notification report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Increments per report, wraps at 65535
    pub seqno: u16,
    /// Non-zero for watchdog, keep-alive and event reports
    pub flags: u16,
    /// Microsecond tick of the level change
    pub tick: u32,
    /// Levels of GPIO 0-31
    pub level: u32,
}

/// Bitmask selecting one GPIO in bank 1
pub fn gpio_mask(gpio: u32) -> u32 {
    1u32 << gpio.min(PI_MAX_BANK1_GPIO)
}
