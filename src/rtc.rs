//! DS3231 real-time clock.
//!
//! The time is kept in seven BCD registers starting at 0x00. Only one
//! century bit exists (bit 7 of the month register), so the clock can tell
//! apart two centuries: 1900-1999 and 2000-2099. Writing 2100 or later wraps
//! back to the 1900s on the next read. That is a hardware limit, not
//! something the driver tries to paper over.

use embedded_hal_async::i2c::{Error as _, I2c};
use log::{debug, error};

use crate::datetime::DateTime;
use crate::Error;

// I2C_ADDRESS is the fixed 7-bit bus address of the DS3231.
pub const I2C_ADDRESS: u8 = 0x68;

// TIME_REGS is the first of the seven time-keeping registers.
pub const TIME_REGS: u8 = 0x00;

// ALARM_REGS is the first of the alarm registers, directly after the time.
pub const ALARM_REGS: u8 = 0x07;

const CENTURY_BIT: u8 = 0x80;

fn bcd_to_dec(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

fn dec_to_bcd(dec: u8) -> u8 {
    ((dec / 10) << 4) | (dec % 10)
}

/// Decodes the seven time registers.
///
/// Year = 1900 + 100 * century bit + BCD year.
pub fn decode_registers(data: &[u8; 7]) -> Result<DateTime, Error> {
    let second = bcd_to_dec(data[0] & 0x7F);
    let minute = bcd_to_dec(data[1] & 0x7F);
    // Bit 6 selects 12h mode; the driver always writes 24h.
    let hour = bcd_to_dec(data[2] & 0x3F);
    let day = bcd_to_dec(data[4] & 0x3F);
    let month = bcd_to_dec(data[5] & 0x1F);
    let century = u16::from((data[5] & CENTURY_BIT) >> 7);
    let year = 1900 + century * 100 + u16::from(bcd_to_dec(data[6]));

    DateTime::new(year, month, day, hour, minute, second).map_err(|e| {
        error!("RTC registers hold no valid date: {:02X?}", data);
        e
    })
}

/// Encodes `datetime` into the seven time registers.
///
/// Years before 1900 cannot be represented at all. Years from 2100 on are
/// accepted but only the lowest century bit is kept, so they read back a
/// multiple of 200 years earlier.
pub fn encode_registers(datetime: &DateTime) -> Result<[u8; 7], Error> {
    if datetime.year < 1900 {
        error!("Year {} is before the RTC epoch (1900)", datetime.year);
        return Err(Error::InvalidArg);
    }
    let century = (((datetime.year - 1900) / 100) & 1) as u8;

    Ok([
        dec_to_bcd(datetime.second),
        dec_to_bcd(datetime.minute),
        dec_to_bcd(datetime.hour),
        dec_to_bcd(datetime.weekday()),
        dec_to_bcd(datetime.day),
        dec_to_bcd(datetime.month) | (century << 7),
        dec_to_bcd((datetime.year % 100) as u8),
    ])
}

/// What prompted a clock synchronisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// The system just booted and its clock may be unset.
    Boot,
    /// The system clock was just set, by the user or by NTP.
    TimeChanged,
}

/// Which clock should be corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Set the system clock from the RTC.
    RtcToSystem,
    /// Write the system clock to the RTC.
    SystemToRtc,
    /// Leave both clocks alone.
    None,
}

/// Picks the clock to trust. A timestamp is plausible when it is not older
/// than `build_millis`, the build time of the running image.
///
/// At boot a plausible RTC wins, and the RTC is only written when it is
/// implausible. After a time change the system clock was set on purpose, so
/// it is written to the RTC whenever it is plausible, whatever the RTC holds.
pub fn sync_direction(
    event: SyncEvent,
    rtc_millis: i64,
    system_millis: i64,
    build_millis: i64,
) -> SyncDirection {
    match event {
        SyncEvent::Boot if rtc_millis >= build_millis => SyncDirection::RtcToSystem,
        _ if system_millis >= build_millis => SyncDirection::SystemToRtc,
        _ => SyncDirection::None,
    }
}

/// A DS3231 on an async I2C bus.
pub struct Ds3231<I2C> {
    i2c: I2C,
}

impl<I2C> Ds3231<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Reads the current UTC date and time.
    pub async fn datetime(&mut self) -> Result<DateTime, Error> {
        let mut data = [0u8; 7];
        self.i2c
            .write_read(I2C_ADDRESS, &[TIME_REGS], &mut data)
            .await
            .map_err(|e| {
                error!("Failed to read RTC time registers: {:?}", e.kind());
                Error::BusFailure
            })?;
        debug!("RTC time registers: {:02X?}", data);
        decode_registers(&data)
    }

    /// Sets the RTC to `datetime` (UTC).
    pub async fn set_datetime(&mut self, datetime: &DateTime) -> Result<(), Error> {
        let data = encode_registers(datetime)?;
        let mut buffer = [0u8; 8];
        buffer[0] = TIME_REGS;
        buffer[1..].copy_from_slice(&data);

        debug!("Writing RTC time registers: {:02X?}", data);
        self.i2c.write(I2C_ADDRESS, &buffer).await.map_err(|e| {
            error!("Failed to write RTC time registers: {:?}", e.kind());
            Error::BusFailure
        })
    }

    /// Milliseconds since the Unix epoch according to the RTC.
    pub async fn epoch_millis(&mut self) -> Result<i64, Error> {
        Ok(self.datetime().await?.epoch_millis())
    }

    /// Sets the RTC from milliseconds since the Unix epoch.
    pub async fn set_epoch_millis(&mut self, millis: i64) -> Result<(), Error> {
        let datetime = DateTime::from_epoch_millis(millis)?;
        self.set_datetime(&datetime).await
    }
}
