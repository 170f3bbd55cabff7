//! # CoDrone Link Library
//!
//! Talk to a CoDrone EDU over its USB serial link.
//!
//! This library provides the binary protocol layer: payload codecs, frame
//! building, a resynchronizing stream parser, a cache of the latest
//! telemetry, and request/response waits bounded by timeouts.
//!
//! ```no_run
//! use std::time::Duration;
//! use codrone_link::config::Config;
//! use codrone_link::link::DroneLink;
//! use codrone_link::protocol::types::{DataType, FlightEvent};
//!
//! # #[tokio::main]
//! # async fn main() -> codrone_link::error::Result<()> {
//! let config = Config::default();
//! codrone_link::logging::init(&config.logging);
//!
//! let link = DroneLink::open_serial(&config)?;
//! let trim = link.request(DataType::Trim, Duration::from_secs(2)).await?;
//! println!("{:?}", trim);
//!
//! link.trigger_flight_event(FlightEvent::TakeOff).await?;
//! link.close().await;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod protocol;
pub mod receiver;
pub mod serial;
pub mod status;
