//! Incremental decoder for the byte stream coming out of the HPM sensor.
//!
//! The sensor interleaves 2-byte command acknowledgements with 32-byte data
//! frames, and the serial port hands them over in chunks of any size. The
//! decoder accumulates chunks into a bounded buffer and classifies the front
//! of the buffer by its 2-byte marker.

use heapless::Vec;
use log::{debug, error, warn};

use crate::constants::{ACK_ERROR, ACK_OK, BUFFER_CAPACITY, DATA_FRAME_LEN, DATA_FRAME_MARKER};
use crate::reading::Reading;

/// Synchronisation state of the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The front of the buffer has not been classified yet.
    Idle,
    /// A data frame marker was seen; waiting for the rest of the frame.
    ReadingFrame,
}

/// What a call to [`FrameDecoder::ingest`] recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Unknown marker. The buffer was dropped to resynchronise.
    Ignored,
    /// The sensor accepted the last command.
    Acknowledged,
    /// The sensor rejected the last command.
    AckError,
    /// A full data frame arrived but its checksum did not match.
    FrameInvalid,
    /// A full, checksum-valid data frame.
    FrameValid(Reading),
}

pub struct FrameDecoder {
    buffer: Vec<u8, BUFFER_CAPACITY>,
    state: State,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Number of bytes currently held back for the next call.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drops everything buffered and goes back to `Idle`.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = State::Idle;
    }

    /// Appends `chunk` to the stream and reports at most one recognised message.
    ///
    /// Bytes following a completed data frame stay buffered; call again with
    /// an empty chunk to examine them without waiting for new input.
    pub fn ingest(&mut self, chunk: &[u8]) -> Option<Event> {
        if self.buffer.extend_from_slice(chunk).is_err() {
            // Too far behind to make sense of what is buffered. Start over
            // and pick up at the next marker.
            warn!(
                "Decoder buffer overflow ({} + {} bytes), resynchronising",
                self.buffer.len(),
                chunk.len()
            );
            self.reset();
            return None;
        }

        if self.buffer.len() < 2 {
            return None;
        }

        if self.state == State::Idle {
            match u16::from_be_bytes([self.buffer[0], self.buffer[1]]) {
                DATA_FRAME_MARKER => self.state = State::ReadingFrame,
                ACK_OK => {
                    debug!("Received ACK from sensor");
                    self.buffer.clear();
                    return Some(Event::Acknowledged);
                }
                ACK_ERROR => {
                    warn!("Received ERROR command response from sensor");
                    self.buffer.clear();
                    return Some(Event::AckError);
                }
                marker => {
                    warn!(
                        "Ignoring unexpected bytes from sensor (marker {:04X}, {} bytes dropped)",
                        marker,
                        self.buffer.len()
                    );
                    self.buffer.clear();
                    return Some(Event::Ignored);
                }
            }
        }

        if self.buffer.len() < DATA_FRAME_LEN {
            return None;
        }

        let mut frame = [0u8; DATA_FRAME_LEN];
        frame.copy_from_slice(&self.buffer[..DATA_FRAME_LEN]);
        self.consume_frame();
        self.state = State::Idle;

        Some(match parse_frame(&frame) {
            Some(reading) => {
                debug!("Processed frame - PM2.5: {}, PM10: {}", reading.pm2_5, reading.pm10);
                Event::FrameValid(reading)
            }
            None => Event::FrameInvalid,
        })
    }

    // Shifts the bytes that followed the frame to the front of the buffer.
    fn consume_frame(&mut self) {
        let len = self.buffer.len();
        self.buffer.copy_within(DATA_FRAME_LEN..len, 0);
        self.buffer.truncate(len - DATA_FRAME_LEN);
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Low 16 bits of the sum of the first 30 bytes of a data frame.
pub fn frame_checksum(frame: &[u8; DATA_FRAME_LEN]) -> u16 {
    frame[..DATA_FRAME_LEN - 2]
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)))
}

/// Validates a complete data frame and extracts the PM values from it.
pub fn parse_frame(frame: &[u8; DATA_FRAME_LEN]) -> Option<Reading> {
    debug!("Data frame: {:02X?}", frame);

    let expected = u16::from_be_bytes([frame[30], frame[31]]);
    let calculated = frame_checksum(frame);
    if expected != calculated {
        error!(
            "Bad checksum: Calculated {:04X}, Received {:04X}. Ignoring frame.",
            calculated, expected
        );
        return None;
    }

    Some(Reading {
        pm2_5: u16::from_be_bytes([frame[6], frame[7]]),
        pm10: u16::from_be_bytes([frame[8], frame[9]]),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a valid data frame carrying the given values. The bytes that
    /// carry no PM value are filled with a recognisable pattern.
    pub(crate) fn data_frame(pm2_5: u16, pm10: u16) -> [u8; DATA_FRAME_LEN] {
        let mut frame = [0u8; DATA_FRAME_LEN];
        frame[..2].copy_from_slice(&DATA_FRAME_MARKER.to_be_bytes());
        frame[2..4].copy_from_slice(&28u16.to_be_bytes());
        frame[4..6].copy_from_slice(&[0x00, 0x07]);
        frame[6..8].copy_from_slice(&pm2_5.to_be_bytes());
        frame[8..10].copy_from_slice(&pm10.to_be_bytes());
        for (i, b) in frame[10..30].iter_mut().enumerate() {
            *b = 0x10 + i as u8;
        }
        let checksum = frame_checksum(&frame);
        frame[30..].copy_from_slice(&checksum.to_be_bytes());
        frame
    }

    fn collect(decoder: &mut FrameDecoder, chunk: &[u8]) -> std::vec::Vec<Event> {
        let mut events = std::vec::Vec::new();
        let mut next = decoder.ingest(chunk);
        while let Some(event) = next {
            events.push(event);
            next = decoder.ingest(&[]);
        }
        events
    }

    #[test]
    fn whole_frame_in_one_chunk() {
        let mut decoder = FrameDecoder::new();
        let event = decoder.ingest(&data_frame(100, 50));
        assert_eq!(event, Some(Event::FrameValid(Reading { pm2_5: 100, pm10: 50 })));
        assert_eq!(decoder.state(), State::Idle);
        assert!(decoder.is_empty());
    }

    #[test]
    fn frame_split_at_every_boundary() {
        let frame = data_frame(321, 654);
        for split in 0..=DATA_FRAME_LEN {
            let mut decoder = FrameDecoder::new();
            let mut events = collect(&mut decoder, &frame[..split]);
            events.extend(collect(&mut decoder, &frame[split..]));
            assert_eq!(
                events,
                [Event::FrameValid(Reading { pm2_5: 321, pm10: 654 })],
                "split at {}",
                split
            );
        }
    }

    #[test]
    fn frame_one_byte_at_a_time() {
        let frame = data_frame(7, 9);
        let mut decoder = FrameDecoder::new();
        let mut events = std::vec::Vec::new();
        for (i, b) in frame.iter().enumerate() {
            events.extend(collect(&mut decoder, core::slice::from_ref(b)));
            if i >= 1 && i < DATA_FRAME_LEN - 1 {
                assert_eq!(decoder.state(), State::ReadingFrame);
            }
        }
        assert_eq!(events, [Event::FrameValid(Reading { pm2_5: 7, pm10: 9 })]);
    }

    #[test]
    fn ten_ten_twelve_chunks() {
        let frame = data_frame(100, 50);
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.ingest(&frame[..10]), None);
        assert_eq!(decoder.state(), State::ReadingFrame);
        assert_eq!(decoder.ingest(&frame[10..20]), None);
        assert_eq!(
            decoder.ingest(&frame[20..]),
            Some(Event::FrameValid(Reading { pm2_5: 100, pm10: 50 }))
        );
    }

    #[test]
    fn any_corrupted_byte_invalidates_the_frame() {
        let frame = data_frame(100, 50);
        for i in 2..DATA_FRAME_LEN {
            let mut corrupted = frame;
            corrupted[i] ^= 0x01;
            let mut decoder = FrameDecoder::new();
            assert_eq!(decoder.ingest(&corrupted), Some(Event::FrameInvalid), "byte {}", i);
            assert_eq!(decoder.state(), State::Idle);
            assert!(decoder.is_empty());
        }
    }

    #[test]
    fn inverted_checksum_is_rejected() {
        let mut frame = data_frame(100, 50);
        frame[30] = !frame[30];
        frame[31] = !frame[31];
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.ingest(&frame), Some(Event::FrameInvalid));
    }

    #[test]
    fn acknowledgements() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.ingest(&[0xA5]), None);
        assert_eq!(decoder.ingest(&[0xA5]), Some(Event::Acknowledged));
        assert!(decoder.is_empty());
        assert_eq!(decoder.ingest(&[0x96, 0x96]), Some(Event::AckError));
        assert!(decoder.is_empty());
        assert_eq!(decoder.state(), State::Idle);
    }

    #[test]
    fn acknowledgement_drops_the_rest_of_its_chunk() {
        let mut decoder = FrameDecoder::new();
        let mut chunk = std::vec::Vec::from([0xA5, 0xA5]);
        chunk.extend_from_slice(&data_frame(1, 2));
        assert_eq!(collect(&mut decoder, &chunk), [Event::Acknowledged]);
        assert!(decoder.is_empty());
    }

    #[test]
    fn lookahead_after_a_frame_is_kept() {
        let mut decoder = FrameDecoder::new();
        let mut chunk = std::vec::Vec::from(data_frame(10, 20));
        chunk.extend_from_slice(&data_frame(11, 21));
        chunk.extend_from_slice(&[0xA5, 0xA5]);

        assert_eq!(
            decoder.ingest(&chunk),
            Some(Event::FrameValid(Reading { pm2_5: 10, pm10: 20 }))
        );
        assert_eq!(decoder.buffered(), DATA_FRAME_LEN + 2);
        assert_eq!(
            decoder.ingest(&[]),
            Some(Event::FrameValid(Reading { pm2_5: 11, pm10: 21 }))
        );
        assert_eq!(decoder.ingest(&[]), Some(Event::Acknowledged));
        assert_eq!(decoder.ingest(&[]), None);
    }

    #[test]
    fn lookahead_is_kept_after_an_invalid_frame() {
        let mut bad = data_frame(1, 1);
        bad[31] ^= 0xFF;
        let mut chunk = std::vec::Vec::from(bad);
        chunk.extend_from_slice(&data_frame(5, 6));

        let mut decoder = FrameDecoder::new();
        assert_eq!(
            collect(&mut decoder, &chunk),
            [Event::FrameInvalid, Event::FrameValid(Reading { pm2_5: 5, pm10: 6 })]
        );
    }

    #[test]
    fn noise_is_ignored_and_never_accepted() {
        let mut decoder = FrameDecoder::new();
        let mut seed: u32 = 0x1234_5678;
        for _ in 0..2_000 {
            let mut chunk = [0u8; 7];
            for b in chunk.iter_mut() {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                // Keep clear of 0x42 so no byte pair can form a frame marker.
                *b = match (seed >> 16) as u8 {
                    0x42 => 0x43,
                    b => b,
                };
            }
            for event in collect(&mut decoder, &chunk) {
                assert!(!matches!(event, Event::FrameValid(_)));
            }
            assert!(decoder.buffered() <= BUFFER_CAPACITY);
        }
    }

    #[test]
    fn misaligned_frame_is_found_once_marker_leads() {
        let mut decoder = FrameDecoder::new();
        // Garbage in its own read is dropped in one go.
        assert_eq!(decoder.ingest(&[0x00, 0x11, 0x22]), Some(Event::Ignored));
        assert_eq!(
            decoder.ingest(&data_frame(42, 43)),
            Some(Event::FrameValid(Reading { pm2_5: 42, pm10: 43 }))
        );
    }

    #[test]
    fn overflow_resets_then_recovers() {
        let mut decoder = FrameDecoder::new();
        // A marker commits to ReadingFrame; then far too much data arrives at once.
        assert_eq!(decoder.ingest(&[0x42, 0x4D]), None);
        assert_eq!(decoder.state(), State::ReadingFrame);

        let flood = [0x55u8; BUFFER_CAPACITY];
        assert_eq!(decoder.ingest(&flood), None);
        assert_eq!(decoder.state(), State::Idle);
        assert!(decoder.is_empty());

        assert_eq!(
            decoder.ingest(&data_frame(100, 50)),
            Some(Event::FrameValid(Reading { pm2_5: 100, pm10: 50 }))
        );
    }

    #[test]
    fn buffer_fills_exactly_to_capacity() {
        let mut decoder = FrameDecoder::new();
        let mut chunk = std::vec::Vec::new();
        for _ in 0..16 {
            chunk.extend_from_slice(&data_frame(1, 2));
        }
        assert_eq!(chunk.len(), BUFFER_CAPACITY);
        let events = collect(&mut decoder, &chunk);
        assert_eq!(events.len(), 16);
        assert!(decoder.is_empty());
    }

    #[test]
    fn optimistic_marker_commits_until_32_bytes() {
        let mut decoder = FrameDecoder::new();
        let mut fake = [0xEEu8; DATA_FRAME_LEN];
        fake[0] = 0x42;
        fake[1] = 0x4D;
        assert_eq!(decoder.ingest(&fake[..31]), None);
        assert_eq!(decoder.state(), State::ReadingFrame);
        assert_eq!(decoder.ingest(&fake[31..]), Some(Event::FrameInvalid));
        assert_eq!(decoder.state(), State::Idle);
    }
}
