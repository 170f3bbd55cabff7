//! # Stream Parser
//!
//! Turns an arbitrarily chunked byte stream into validated frames.
//!
//! ```text
//! SeekingStart → ReadingHeader → ReadingPayload → ValidatingChecksum
//!      ↑                │                                │
//!      └──── resync ────┴────────── dispatch / resync ───┘
//! ```
//!
//! Corrupted frames, unknown tags and malformed payloads are dropped and
//! counted; parsing always continues with the next start marker. A frame
//! that passes the checksum and decodes is handed to the device-state store
//! first, then to the request bridge.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::bridge::RequestBridge;
use crate::error::DecodeError;
use crate::protocol::decoder::decode_payload;
use crate::protocol::frame::{checksum, frame_size, is_frame_start, Header};
use crate::protocol::payload::Payload;
use crate::protocol::types::*;
use crate::status::DeviceStatus;

/// Default age after which a partially received frame is abandoned
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(600);

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Scanning for `0x0A 0x55`
    SeekingStart,
    /// Start marker found, waiting for the 4 header bytes
    ReadingHeader,
    /// Header read, waiting for payload and checksum
    ReadingPayload,
    /// Whole frame buffered
    ValidatingChecksum,
}

/// A checksum-valid, decoded frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceivedFrame {
    pub header: Header,
    pub payload: Payload,
}

/// Running counters for one receiver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub frames_dispatched: u64,
    pub checksum_mismatches: u64,
    pub decode_errors: u64,
    pub unknown_tags: u64,
    /// Bytes skipped while resynchronizing
    pub bytes_discarded: u64,
}

/// Where decoded frames go
#[derive(Debug, Clone)]
struct Dispatch {
    status: Arc<DeviceStatus>,
    bridge: Arc<RequestBridge>,
}

/// Incremental frame parser
#[derive(Debug)]
pub struct Receiver {
    buffer: BytesMut,
    state: ReceiverState,
    /// When the start marker of the frame at the head of the buffer arrived
    frame_started: Option<Instant>,
    receive_timeout: Duration,
    stats: ReceiverStats,
    dispatch: Option<Dispatch>,
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new(DEFAULT_RECEIVE_TIMEOUT)
    }
}

impl Receiver {
    /// Parser that only returns frames from [`Receiver::feed`]
    pub fn new(receive_timeout: Duration) -> Self {
        Self {
            buffer: BytesMut::with_capacity(frame_size(MAX_PAYLOAD_SIZE) * 2),
            state: ReceiverState::SeekingStart,
            frame_started: None,
            receive_timeout,
            stats: ReceiverStats::default(),
            dispatch: None,
        }
    }

    /// Parser that also updates `status` and resolves `bridge` waiters
    pub fn with_dispatch(
        status: Arc<DeviceStatus>,
        bridge: Arc<RequestBridge>,
        receive_timeout: Duration,
    ) -> Self {
        let mut receiver = Self::new(receive_timeout);
        receiver.dispatch = Some(Dispatch { status, bridge });
        receiver
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Bytes held waiting for the rest of a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop buffered bytes and return to `SeekingStart`
    ///
    /// Counters are kept.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ReceiverState::SeekingStart;
        self.frame_started = None;
    }

    /// Append `bytes` and parse as far as possible
    ///
    /// # Returns
    ///
    /// Every frame completed by this chunk, in arrival order. May be empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use codrone_link::protocol::encoder::encode_frame;
    /// use codrone_link::protocol::payload::{Payload, Trim};
    /// use codrone_link::receiver::Receiver;
    ///
    /// let trim = Payload::Trim(Trim { roll: 5, pitch: -3, yaw: 0, throttle: 0 });
    /// let frame = encode_frame(&trim)?;
    ///
    /// let mut receiver = Receiver::default();
    /// assert!(receiver.feed(&frame[..5]).is_empty());
    /// let frames = receiver.feed(&frame[5..]);
    /// assert_eq!(frames[0].payload, trim);
    /// # Ok::<(), codrone_link::error::EncodeError>(())
    /// ```
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ReceivedFrame> {
        self.expire_stale_frame();
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();

        loop {
            match self.state {
                ReceiverState::SeekingStart => {
                    if !self.seek_start() {
                        break;
                    }
                    self.state = ReceiverState::ReadingHeader;
                    self.frame_started = Some(Instant::now());
                }

                ReceiverState::ReadingHeader => {
                    if self.buffer.len() < START_MARKER.len() + HEADER_SIZE {
                        break;
                    }
                    let length = self.declared_length();
                    if length > MAX_PAYLOAD_SIZE {
                        debug!("Declared length {} exceeds maximum, resyncing", length);
                        self.resync();
                        continue;
                    }
                    self.state = ReceiverState::ReadingPayload;
                }

                ReceiverState::ReadingPayload => {
                    if self.buffer.len() < frame_size(self.declared_length()) {
                        break;
                    }
                    self.state = ReceiverState::ValidatingChecksum;
                }

                ReceiverState::ValidatingChecksum => {
                    if let Some(frame) = self.take_frame() {
                        frames.push(frame);
                    }
                }
            }
        }

        frames
    }

    /// Discard everything before the next start marker
    ///
    /// Returns true with the marker at the head of the buffer. A lone
    /// trailing `0x0A` is kept since its `0x55` may be in the next chunk.
    fn seek_start(&mut self) -> bool {
        let found = self
            .buffer
            .windows(START_MARKER.len())
            .position(is_frame_start);

        let skip = match found {
            Some(position) => position,
            None if self.buffer.last() == Some(&START_BYTE_1) => self.buffer.len() - 1,
            None => self.buffer.len(),
        };

        if skip > 0 {
            trace!("Discarding {} bytes before start marker", skip);
            self.buffer.advance(skip);
            self.stats.bytes_discarded += skip as u64;
        }

        found.is_some()
    }

    fn declared_length(&self) -> usize {
        self.buffer[START_MARKER.len() + 1] as usize
    }

    /// Drop the leading start byte and look for the next marker
    fn resync(&mut self) {
        self.buffer.advance(1);
        self.stats.bytes_discarded += 1;
        self.state = ReceiverState::SeekingStart;
        self.frame_started = None;
    }

    fn expire_stale_frame(&mut self) {
        let Some(started) = self.frame_started else {
            return;
        };

        if started.elapsed() > self.receive_timeout {
            debug!(
                "Abandoning partial frame ({} bytes) after {:?}",
                self.buffer.len(),
                self.receive_timeout
            );
            self.stats.bytes_discarded += self.buffer.len() as u64;
            self.reset();
        }
    }

    /// Validate the buffered frame, consume it, and decode it
    fn take_frame(&mut self) -> Option<ReceivedFrame> {
        let total = frame_size(self.declared_length());
        let header_start = START_MARKER.len();
        let payload_start = header_start + HEADER_SIZE;
        let payload_end = total - CHECKSUM_SIZE;

        let header = Header::from_bytes([
            self.buffer[header_start],
            self.buffer[header_start + 1],
            self.buffer[header_start + 2],
            self.buffer[header_start + 3],
        ]);
        let received = u16::from_le_bytes([self.buffer[payload_end], self.buffer[payload_end + 1]]);
        let calculated = checksum(&header, &self.buffer[payload_start..payload_end]);

        if received != calculated {
            debug!(
                "CRC mismatch for {:?}: expected 0x{:04X}, got 0x{:04X}",
                header.data_type, calculated, received
            );
            self.stats.checksum_mismatches += 1;
            self.resync();
            return None;
        }

        let frame = self.buffer.split_to(total);
        self.state = ReceiverState::SeekingStart;
        self.frame_started = None;

        match decode_payload(header.data_type, &frame[payload_start..payload_end]) {
            Ok(payload) => {
                trace!("Received {:?} from {:?}", header.data_type, header.from);
                self.stats.frames_dispatched += 1;
                self.dispatch(payload);
                Some(ReceivedFrame { header, payload })
            }
            Err(DecodeError::UnknownTag(tag)) => {
                warn!("Dropping frame with unknown data type 0x{:02X}", tag);
                self.stats.unknown_tags += 1;
                None
            }
            Err(e) => {
                warn!("Dropping malformed {:?} frame: {}", header.data_type, e);
                self.stats.decode_errors += 1;
                None
            }
        }
    }

    fn dispatch(&self, payload: Payload) {
        let Some(dispatch) = &self.dispatch else {
            return;
        };

        dispatch.status.update(payload);
        dispatch.bridge.resolve(payload);
        if let Payload::Ack(ack) = payload {
            dispatch.bridge.resolve_ack(ack);
        }
    }
}
