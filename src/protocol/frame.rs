//! # Frame Format
//!
//! Frame layout and integrity check for the CoDrone EDU serial protocol.
//!
//! ```text
//! [0x0A][0x55][data_type][length][from][to][payload: length bytes][crc16 LE]
//! ```
//!
//! The CRC covers the four header bytes followed by the payload.

use super::crc::{crc16_ccitt, crc16_extend};
use super::types::*;
use crate::error::EncodeError;

/// Frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub data_type: DataType,
    /// Payload length in bytes
    pub length: u8,
    pub from: DeviceType,
    pub to: DeviceType,
}

impl Header {
    /// Header for a payload sent from the host to the drone
    pub fn new(data_type: DataType, length: u8) -> Self {
        Self {
            data_type,
            length,
            from: DeviceType::Base,
            to: DeviceType::Drone,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        [
            self.data_type.to_byte(),
            self.length,
            self.from.to_byte(),
            self.to.to_byte(),
        ]
    }

    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            data_type: DataType::from_byte(bytes[0]),
            length: bytes[1],
            from: DeviceType::from_byte(bytes[2]),
            to: DeviceType::from_byte(bytes[3]),
        }
    }
}

/// Checksum over header then payload
///
/// Pure and order-sensitive; matches the firmware's CRC16 bit for bit.
pub fn checksum(header: &Header, payload: &[u8]) -> u16 {
    crc16_extend(crc16_ccitt(&header.to_bytes()), payload)
}

/// Build a complete frame addressed from the host to the drone
///
/// # Errors
///
/// Returns [`EncodeError::PayloadTooLarge`] if `payload` exceeds
/// [`MAX_PAYLOAD_SIZE`].
///
/// # Examples
///
/// ```
/// use codrone_link::protocol::frame::build_frame;
/// use codrone_link::protocol::types::DataType;
///
/// let frame = build_frame(DataType::Request, &[0x52])?;
/// assert_eq!(&frame[..2], &[0x0A, 0x55]);
/// assert_eq!(frame.len(), 2 + 4 + 1 + 2);
/// # Ok::<(), codrone_link::error::EncodeError>(())
/// ```
pub fn build_frame(data_type: DataType, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    build_frame_with_route(data_type, payload, DeviceType::Base, DeviceType::Drone)
}

/// Build a complete frame with explicit endpoints
pub fn build_frame_with_route(
    data_type: DataType,
    payload: &[u8],
    from: DeviceType,
    to: DeviceType,
) -> Result<Vec<u8>, EncodeError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(EncodeError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let header = Header {
        data_type,
        length: payload.len() as u8,
        from,
        to,
    };
    let crc = checksum(&header, payload);

    let mut frame = Vec::with_capacity(MIN_FRAME_SIZE + payload.len());
    frame.extend_from_slice(&START_MARKER);
    frame.extend_from_slice(&header.to_bytes());
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&crc.to_le_bytes());

    Ok(frame)
}

/// True if `window` begins with the start marker sequence
pub fn is_frame_start(window: &[u8]) -> bool {
    window.starts_with(&START_MARKER)
}

/// Total frame size for a payload of `payload_len` bytes
pub fn frame_size(payload_len: usize) -> usize {
    MIN_FRAME_SIZE + payload_len
}
