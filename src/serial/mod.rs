//! # Serial Communication Module
//!
//! Opens the USB serial link to a CoDrone EDU (or its controller acting as
//! a radio bridge) and hands out the two halves the link session runs on.
//!
//! This module handles:
//! - Opening the port at [`DRONE_BAUD_RATE`] (115 200 baud) 8N1
//! - Trying a list of candidate device paths
//! - Splitting the stream into a [`ByteSource`] and a [`ByteSink`]

pub mod port_trait;

pub use port_trait::{ByteSink, ByteSource, StreamSink, StreamSource};

use crate::error::{CodroneError, Result};
use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Baud rate used by the CoDrone EDU firmware
pub const DRONE_BAUD_RATE: u32 = 115_200;

/// Default device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // CP210x bridge on the controller
    "/dev/ttyACM0",
];

/// Read half of an opened port
pub type SerialSource = StreamSource<ReadHalf<tokio_serial::SerialStream>>;

/// Write half of an opened port
pub type SerialSink = StreamSink<WriteHalf<tokio_serial::SerialStream>>;

/// Serial connection to the drone
pub struct DroneSerial {
    port: tokio_serial::SerialStream,
    device_path: String,
}

impl std::fmt::Debug for DroneSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DroneSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl DroneSerial {
    /// Open a specific device path
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Usually [`DRONE_BAUD_RATE`]
    ///
    /// # Errors
    ///
    /// Returns [`CodroneError::Serial`] if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use codrone_link::serial::{DroneSerial, DRONE_BAUD_RATE};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> codrone_link::error::Result<()> {
    /// let serial = DroneSerial::open("/dev/ttyUSB0", DRONE_BAUD_RATE)?;
    /// let (source, sink) = serial.split();
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = Self::open_port(path, baud_rate)?;
        info!("Opened drone serial port at {} ({} baud)", path, baud_rate);
        Ok(Self {
            port,
            device_path: path.to_string(),
        })
    }

    /// Open the first path in `paths` that works
    ///
    /// # Errors
    ///
    /// Returns [`CodroneError::SerialPortNotFound`] listing every path tried
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open(path, baud_rate) {
                Ok(serial) => return Ok(serial),
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(CodroneError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| CodroneError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Device path of the opened port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Split into independently owned read and write halves
    pub fn split(self) -> (SerialSource, SerialSink) {
        let (reader, writer) = tokio::io::split(self.port);
        (StreamSource::new(reader), StreamSink::new(writer))
    }
}
