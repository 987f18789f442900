use crate::constants::{MEASUREMENT_INTERVAL_US, PARTICLE_MAX, PARTICLE_RESOLUTION, POWER_CONSUMPTION_UA};
use crate::reading::Reading;

/// Which value of a [`Reading`] a channel reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Pm2_5,
    Pm10,
}

/// Describes one of the values the sensor reports, for hosts that register
/// the HPM with a sensor framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub name: &'static str,
    pub quantity: Quantity,
    /// Unit of the value.
    pub unit: &'static str,
    pub max_range: u16,
    pub resolution: u16,
    pub power_ua: u32,
    /// Interval between two samples in auto-send mode.
    pub min_delay_us: u32,
}

impl Channel {
    const fn particle(name: &'static str, quantity: Quantity) -> Channel {
        Channel {
            name,
            quantity,
            unit: "µg/m³",
            max_range: PARTICLE_MAX,
            resolution: PARTICLE_RESOLUTION,
            power_ua: POWER_CONSUMPTION_UA,
            min_delay_us: MEASUREMENT_INTERVAL_US,
        }
    }

    /// Picks this channel's value out of a reading.
    pub fn value(&self, reading: &Reading) -> u16 {
        match self.quantity {
            Quantity::Pm2_5 => reading.pm2_5,
            Quantity::Pm10 => reading.pm10,
        }
    }
}

pub const PM2_5: Channel = Channel::particle("pm2_5", Quantity::Pm2_5);
pub const PM10: Channel = Channel::particle("pm10", Quantity::Pm10);

/// Every channel, in the order the values appear in a data frame.
pub const CHANNELS: [Channel; 2] = [PM2_5, PM10];
