use crate::constants::{COMMAND_HEAD, COMMAND_LEN};

/// The control commands understood by the HPM sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Turn the fan and laser on and start measuring.
    StartMeasurement,
    /// Stop measuring.
    StopMeasurement,
    /// Make the sensor emit a data frame every second without being asked.
    EnableAutoSend,
    /// Stop the periodic data frames.
    StopAutoSend,
}

impl Command {
    /// The opcode byte of the command.
    pub const fn opcode(self) -> u8 {
        match self {
            Command::StartMeasurement => 0x01,
            Command::StopMeasurement => 0x02,
            Command::EnableAutoSend => 0x40,
            Command::StopAutoSend => 0x20,
        }
    }

    /// Builds the 4-byte frame `HEAD LEN OPCODE CS` for this command.
    pub const fn frame(self) -> [u8; 4] {
        let body = [COMMAND_HEAD, COMMAND_LEN, self.opcode()];
        [body[0], body[1], body[2], checksum(&body)]
    }
}

/// Two's complement of the 8-bit sum of `bytes`, so that a frame ending
/// with this value sums to zero.
pub const fn checksum(bytes: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    let mut i = 0;
    while i < bytes.len() {
        sum = sum.wrapping_add(bytes[i]);
        i += 1;
    }
    sum.wrapping_neg()
}
