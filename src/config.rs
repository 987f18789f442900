use crate::constants::{READ_CHUNK_LEN, SETTLE_DELAY_MS};

/// Parity setting of the serial line.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Serial line settings the host must apply to the UART before handing it
/// to the driver. The driver itself never reconfigures the port.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl SerialSettings {
    /// Settings required by the HPM sensor: 9600 baud, 8N1.
    pub const fn hpm() -> SerialSettings {
        SerialSettings {
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> SerialSettings {
        SerialSettings::hpm()
    }
}

/// Configuration settings for the HPM sensor session.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// Pause between the two commands of a start or stop sequence, in milliseconds.
    pub settle_delay_ms: u32,
    /// Maximum number of bytes requested from the serial port per `poll`.
    pub read_chunk_len: usize,
}

impl Config {
    /// Creates a new `Config` instance.
    ///
    /// # Arguments
    ///
    /// * `settle_delay_ms` - The pause between paired commands.
    /// * `read_chunk_len` - The size of a single serial read, clamped to `1..=READ_CHUNK_LEN`.
    pub fn new(settle_delay_ms: u32, read_chunk_len: usize) -> Config {
        Config::default()
            .settle_delay_ms(settle_delay_ms)
            .read_chunk_len(read_chunk_len)
    }

    /// Sets the settle delay for the configuration.
    pub fn settle_delay_ms(mut self, settle_delay_ms: u32) -> Self {
        self.settle_delay_ms = settle_delay_ms;
        self
    }

    /// Sets the read chunk length for the configuration.
    ///
    /// Values outside `1..=READ_CHUNK_LEN` are clamped.
    pub fn read_chunk_len(mut self, read_chunk_len: usize) -> Self {
        self.read_chunk_len = read_chunk_len.clamp(1, READ_CHUNK_LEN);
        self
    }
}

/// Provides default configuration values for the HPM sensor.
impl Default for Config {
    /// The default configuration waits 20 ms between commands and reads
    /// up to two data frames worth of bytes at a time.
    fn default() -> Config {
        Config {
            settle_delay_ms: SETTLE_DELAY_MS,
            read_chunk_len: READ_CHUNK_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_requirements() {
        let config = Config::default();
        assert_eq!(config.settle_delay_ms, 20);
        assert_eq!(config.read_chunk_len, 64);

        let serial = SerialSettings::default();
        assert_eq!(serial.baud_rate, 9600);
        assert_eq!(serial.data_bits, 8);
        assert_eq!(serial.parity, Parity::None);
        assert_eq!(serial.stop_bits, 1);
    }

    #[test]
    fn read_chunk_len_is_clamped() {
        assert_eq!(Config::default().read_chunk_len(0).read_chunk_len, 1);
        assert_eq!(Config::default().read_chunk_len(4096).read_chunk_len, 64);
        assert_eq!(Config::new(50, 16), Config { settle_delay_ms: 50, read_chunk_len: 16 });
    }
}
