use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::Error;

/// A single decoded sample from the HPM sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    /// PM2.5 concentration in µg/m³.
    pub pm2_5: u16,
    /// PM10 concentration in µg/m³.
    pub pm10: u16,
}

#[derive(Clone, Copy)]
struct Latest {
    reading: Option<Reading>,
    accepted_frames: u32,
}

/// The latest accepted reading, shared between the task feeding the decoder
/// and any number of pollers.
///
/// The pair is swapped under a critical section so a poller never observes
/// PM2.5 from one frame and PM10 from another.
pub struct SharedReading {
    inner: Mutex<CriticalSectionRawMutex, Cell<Latest>>,
}

impl SharedReading {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Latest {
                reading: None,
                accepted_frames: 0,
            })),
        }
    }

    /// Records a reading taken from a checksum-valid frame.
    pub fn store(&self, reading: Reading) {
        self.inner.lock(|latest| {
            let mut next = latest.get();
            next.reading = Some(reading);
            next.accepted_frames = next.accepted_frames.wrapping_add(1);
            latest.set(next);
        });
    }

    /// Forgets the current reading. The frame counter keeps counting.
    pub fn clear(&self) {
        self.inner.lock(|latest| {
            let mut next = latest.get();
            next.reading = None;
            latest.set(next);
        });
    }

    /// Returns the latest reading, or `Error::DataUnavailable` if none was
    /// accepted since the last `clear`.
    pub fn latest(&self) -> Result<Reading, Error> {
        self.inner
            .lock(|latest| latest.get().reading)
            .ok_or(Error::DataUnavailable)
    }

    pub fn pm2_5(&self) -> Result<u16, Error> {
        self.latest().map(|r| r.pm2_5)
    }

    pub fn pm10(&self) -> Result<u16, Error> {
        self.latest().map(|r| r.pm10)
    }

    /// Number of frames accepted so far. Comparing two values tells a poller
    /// whether a fresh frame arrived in between.
    pub fn accepted_frames(&self) -> u32 {
        self.inner.lock(|latest| latest.get().accepted_frames)
    }
}

impl Default for SharedReading {
    fn default() -> Self {
        Self::new()
    }
}
