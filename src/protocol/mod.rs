//! # CoDrone EDU Protocol Implementation
//!
//! Wire protocol spoken by the CoDrone EDU drone and its controller over
//! the USB serial link.
//!
//! ## Frame Structure
//!
//! ```text
//! [0x0A][0x55][data_type][length][from][to][payload][crc16 LE]
//! ```
//!
//! - **Start marker**: `0x0A 0x55`
//! - **Header**: data type, payload length, sender and receiver addresses
//! - **Payload**: 0-128 bytes, little-endian fields
//! - **CRC**: CRC-16/XMODEM over header and payload
//!
//! Only the data types with a modeled layout are decoded; anything else is
//! surfaced as [`crate::error::DecodeError::UnknownTag`].

pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod payload;
pub mod types;

pub use payload::Payload;
pub use types::DataType;
