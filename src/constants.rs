// COMMAND_HEAD is the byte that starts every command frame sent to the sensor.
pub const COMMAND_HEAD: u8 = 0x68;

// COMMAND_LEN is the value of the length byte of every command frame we send.
pub const COMMAND_LEN: u8 = 0x01;

// ACK_OK is the 2-byte reply the sensor sends when it accepted a command.
pub const ACK_OK: u16 = 0xA5A5;

// ACK_ERROR is the 2-byte reply the sensor sends when it rejected a command.
pub const ACK_ERROR: u16 = 0x9696;

// DATA_FRAME_MARKER is the big-endian marker that opens an auto-send data frame.
pub const DATA_FRAME_MARKER: u16 = 0x424D;

// DATA_FRAME_LEN is the size of a data frame, marker and checksum included.
pub const DATA_FRAME_LEN: usize = 32;

// BUFFER_CAPACITY bounds the decoder's accumulation buffer.
pub const BUFFER_CAPACITY: usize = DATA_FRAME_LEN * 16;

// READ_CHUNK_LEN is the default size of a single read from the serial port.
pub const READ_CHUNK_LEN: usize = DATA_FRAME_LEN * 2;

// SETTLE_DELAY_MS is the pause the sensor needs between two commands.
pub const SETTLE_DELAY_MS: u32 = 20;

// MEASUREMENT_INTERVAL_US is how often the sensor emits a frame in auto-send mode.
pub const MEASUREMENT_INTERVAL_US: u32 = 1_000_000;

// PARTICLE_RESOLUTION is the resolution of both readings, in µg/m³.
pub const PARTICLE_RESOLUTION: u16 = 1;

// PARTICLE_MAX is the upper bound of the measurement range, in µg/m³.
pub const PARTICLE_MAX: u16 = 1000;

// POWER_CONSUMPTION_UA is the typical supply current of the sensor while measuring.
pub const POWER_CONSUMPTION_UA: u32 = 80_000;
