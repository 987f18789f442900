use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Writing to the serial port failed.
    WriteFailure,
    /// Reading from the serial port failed.
    ReadFailure,
    /// No checksum-valid frame has been received since the session started.
    DataUnavailable,
    /// An I2C transaction with the RTC failed.
    BusFailure,
    InvalidArg,
    /// The RTC registers do not hold a valid calendar date.
    InvalidDateTime,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::WriteFailure => f.write_str("serial write failure"),
            Error::ReadFailure => f.write_str("serial read failure"),
            Error::DataUnavailable => f.write_str("no data available"),
            Error::BusFailure => f.write_str("i2c bus failure"),
            Error::InvalidArg => f.write_str("invalid argument"),
            Error::InvalidDateTime => f.write_str("invalid date/time in rtc registers"),
        }
    }
}

impl core::error::Error for Error {}
