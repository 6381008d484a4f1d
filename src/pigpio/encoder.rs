//! # pigpio Command Encoder

use super::protocol::*;

/// Encode a command into its 16-byte wire form
///
/// # Examples
///
/// ```
/// use journey_logger::pigpio::encoder::encode_command;
/// use journey_logger::pigpio::protocol::{Command, PI_CMD_PWM};
///
/// let bytes = encode_command(&Command::new(PI_CMD_PWM, 18, 128));
/// assert_eq!(&bytes[0..4], &[5, 0, 0, 0]);
/// ```
pub fn encode_command(command: &Command) -> [u8; PIGPIO_COMMAND_SIZE] {
    let mut message = [0u8; PIGPIO_COMMAND_SIZE];
    message[0..4].copy_from_slice(&command.cmd.to_le_bytes());
    message[4..8].copy_from_slice(&command.p1.to_le_bytes());
    message[8..12].copy_from_slice(&command.p2.to_le_bytes());
    // p3: no extension
    message
}
