//! # Error Types
//!
//! Custom error types for CoDrone Link using `thiserror`.

use thiserror::Error;

use crate::protocol::types::DataType;

/// Main error type for CoDrone Link
#[derive(Debug, Error)]
pub enum CodroneError {
    /// Payload bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Payload could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A pending request was not satisfied in time
    #[error("Timed out waiting for {0:?}")]
    RequestTimeout(DataType),

    /// A pending request was released before a frame arrived
    #[error("Request for {0:?} was canceled")]
    RequestCanceled(DataType),

    /// The link session has been closed
    #[error("Link is closed")]
    LinkClosed,

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial ports could be opened
    #[error("No drone serial port found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a payload received from the wire was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Byte count does not match the layout for the tag
    #[error("{data_type:?} payload must be {expected} bytes, got {actual}")]
    LengthMismatch {
        data_type: DataType,
        expected: usize,
        actual: usize,
    },

    /// Numeric field outside the protocol's declared bounds
    #[error("{field} value {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },

    /// Floating point field is NaN or infinite
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },

    /// Frame boundary was valid but the tag has no known layout
    #[error("unknown data type 0x{0:02X}")]
    UnknownTag(u8),
}

/// Reasons an outgoing payload was rejected before transmission
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// Field outside its declared range
    #[error("{field} value {value} is out of range ({min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Floating point field is NaN or infinite
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },

    /// Payload longer than a frame can carry
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Result type alias for CoDrone Link
pub type Result<T> = std::result::Result<T, CodroneError>;
