#![cfg_attr(not(test), no_std)]

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};
use log::debug;

mod constants;
pub use constants::*;

mod error;
pub use error::*;

mod config;
pub use config::*;

pub mod command;
pub use command::Command;

pub mod decoder;
pub use decoder::{Event, FrameDecoder, State};

mod reading;
pub use reading::*;

pub mod datetime;
pub mod rtc;
pub mod sensor;

/// Whether the sensor has been told to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationalState {
    /// Measurement and auto-send are off.
    Stopped,
    /// The sensor measures and sends a data frame every second.
    Measuring,
}

/// A session with a Honeywell HPM particle sensor.
///
/// The session owns the serial port and the frame decoder, and publishes
/// every checksum-valid reading into a [`SharedReading`] that other tasks or
/// threads may poll at any time.
///
/// # Type Parameters
///
/// * `Serial`: The serial interface connected to the sensor, configured as
///   described by [`SerialSettings::hpm`]. It must implement
///   `embedded_io_async::Read` and `embedded_io_async::Write`.
/// * `Delay`: Provides the settle time the sensor needs between two commands.
pub struct Hpm<'r, Serial, Delay> {
    serial: Serial,
    delay: Delay,
    config: Config,
    decoder: FrameDecoder,
    reading: &'r SharedReading,
    state: OperationalState,
}

impl<'r, S, D> Hpm<'r, S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    /// Creates a new `Hpm` session.
    ///
    /// # Arguments
    ///
    /// * `serial`: The serial interface for communication with the sensor.
    /// * `delay`: The delay provider used between commands.
    /// * `reading`: Where accepted readings are published.
    /// * `config`: The session configuration.
    pub fn new(serial: S, delay: D, reading: &'r SharedReading, config: Config) -> Self {
        Self {
            serial,
            delay,
            config,
            decoder: FrameDecoder::new(),
            reading,
            state: OperationalState::Stopped,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.state == OperationalState::Measuring
    }

    /// Starts measuring with auto-send enabled.
    ///
    /// The cached reading is reset to unavailable until the first valid
    /// frame arrives, and bytes buffered before the restart are dropped.
    /// Does nothing if the session is already started.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once both commands have been written.
    /// * `Err(Error::WriteFailure)` if the serial port rejected a command. The
    ///   session stays stopped.
    pub async fn start(&mut self) -> Result<(), Error> {
        if self.is_started() {
            debug!("HPM already started");
            return Ok(());
        }

        self.reading.clear();
        self.decoder.reset();
        self.send_pair(Command::StartMeasurement, Command::EnableAutoSend)
            .await
            .map_err(|e| {
                log::error!("Failed to start particle measurement: {:?}", e);
                e
            })?;

        self.state = OperationalState::Measuring;
        debug!("HPM measurement started");
        Ok(())
    }

    /// Stops measuring and disables auto-send.
    ///
    /// The commands are sent even if the session was never started, so a
    /// sensor left running by a previous owner is stopped as well.
    pub async fn stop(&mut self) -> Result<(), Error> {
        self.send_pair(Command::StopMeasurement, Command::StopAutoSend)
            .await
            .map_err(|e| {
                log::error!("Failed to stop particle measurement: {:?}", e);
                e
            })?;

        self.state = OperationalState::Stopped;
        debug!("HPM measurement stopped");
        Ok(())
    }

    /// Hands bytes received from the sensor to the decoder.
    ///
    /// Use this when the host delivers serial data itself (interrupt or
    /// callback). Every message contained in the buffered bytes is processed,
    /// and valid readings are published.
    ///
    /// # Returns
    ///
    /// The last valid reading decoded during this call, if any.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<Reading> {
        let mut latest = None;
        let mut next = self.decoder.ingest(chunk);
        while let Some(event) = next {
            match event {
                Event::FrameValid(reading) => {
                    self.reading.store(reading);
                    latest = Some(reading);
                }
                Event::FrameInvalid => debug!("Keeping previous reading after bad frame"),
                Event::Acknowledged | Event::AckError | Event::Ignored => {}
            }
            // Retained lookahead may already hold the next message.
            next = self.decoder.ingest(&[]);
        }
        latest
    }

    /// Performs a single read from the serial port and feeds the result to
    /// the decoder.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(reading))` if the bytes completed a valid data frame.
    /// * `Ok(None)` if no new reading was decoded yet.
    /// * `Err(Error::ReadFailure)` if the serial port failed. Buffered bytes
    ///   are kept, so a frame interrupted by the failure can still complete.
    pub async fn poll(&mut self) -> Result<Option<Reading>, Error> {
        let mut buffer = [0u8; READ_CHUNK_LEN];
        let len = self.config.read_chunk_len.min(READ_CHUNK_LEN);
        let count = self.serial.read(&mut buffer[..len]).await.map_err(|e| {
            log::error!("Serial read error: {:?}", e);
            Error::ReadFailure
        })?;

        debug!("Received {} bytes: {:02X?}", count, &buffer[..count]);
        Ok(self.feed(&buffer[..count]))
    }

    /// Polls the serial port until a new valid reading arrives.
    ///
    /// # Arguments
    ///
    /// * `max_reads`: How many serial reads to attempt before giving up.
    ///
    /// # Returns
    ///
    /// * `Ok(Reading)` with the freshly decoded values.
    /// * `Err(Error::DataUnavailable)` if no valid frame arrived within `max_reads` reads.
    /// * `Err(Error::ReadFailure)` if the serial port failed.
    pub async fn next_sample(&mut self, max_reads: usize) -> Result<Reading, Error> {
        for _ in 0..max_reads {
            if let Some(reading) = self.poll().await? {
                return Ok(reading);
            }
        }
        log::warn!("No valid frame after {} reads", max_reads);
        Err(Error::DataUnavailable)
    }

    /// Returns the latest PM2.5 and PM10 values.
    pub fn read_sample(&self) -> Result<Reading, Error> {
        self.reading.latest()
    }

    /// Returns the latest PM2.5 concentration in µg/m³, or
    /// `Error::DataUnavailable` if no valid frame was received since `start`.
    pub fn read_pm2_5(&self) -> Result<u16, Error> {
        self.reading.pm2_5()
    }

    /// Returns the latest PM10 concentration in µg/m³, or
    /// `Error::DataUnavailable` if no valid frame was received since `start`.
    pub fn read_pm10(&self) -> Result<u16, Error> {
        self.reading.pm10()
    }

    /// Ends the session and gives back the serial port and delay provider
    /// without talking to the sensor. See [`Hpm::close`] to stop it first.
    pub fn release(self) -> (S, D) {
        (self.serial, self.delay)
    }

    /// Stops the sensor, then ends the session.
    ///
    /// # Returns
    ///
    /// * `Ok((serial, delay))` once the stop commands have been written.
    /// * `Err(Error::WriteFailure)` if they could not be written. The port is
    ///   dropped in that case, as it is no longer usable.
    pub async fn close(mut self) -> Result<(S, D), Error> {
        self.stop().await?;
        Ok(self.release())
    }

    // Writes two commands with the settle delay the sensor needs in between.
    async fn send_pair(&mut self, first: Command, second: Command) -> Result<(), Error> {
        self.write(first).await?;
        self.delay.delay_ms(self.config.settle_delay_ms).await;
        self.write(second).await
    }

    async fn write(&mut self, command: Command) -> Result<(), Error> {
        let frame = command.frame();
        debug!("Executing command {:?}: {:02X?}", command, frame);
        self.serial
            .write_all(&frame)
            .await
            .map_err(|_| Error::WriteFailure)?;
        self.serial.flush().await.map_err(|_| Error::WriteFailure)?;
        Ok(())
    }
}
