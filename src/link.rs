//! # Link Session
//!
//! One open connection to a drone: an outbound sink, a receive task feeding
//! the stream parser, the device-state store and the request bridge.
//!
//! The receive task never waits on callers. Callers wait only on their own
//! pending requests, each bounded by a timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::bridge::RequestBridge;
use crate::config::{Config, LinkConfig};
use crate::error::{CodroneError, Result};
use crate::protocol::encoder::encode_frame;
use crate::protocol::payload::{Ack, Command, Payload, Request};
use crate::protocol::types::{CommandType, DataType, FlightEvent};
use crate::receiver::{Receiver, ReceiverStats};
use crate::serial::{ByteSink, ByteSource, DroneSerial};
use crate::status::DeviceStatus;

/// An open session with one drone
pub struct DroneLink {
    sink: tokio::sync::Mutex<Box<dyn ByteSink>>,
    status: Arc<DeviceStatus>,
    bridge: Arc<RequestBridge>,
    stats: Arc<Mutex<ReceiverStats>>,
    config: LinkConfig,
    read_buffer_size: usize,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for DroneLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DroneLink")
            .field("config", &self.config)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl DroneLink {
    /// Session writing to `sink`
    ///
    /// Nothing is received until [`DroneLink::spawn_receiver`] is called.
    pub fn new<S: ByteSink + 'static>(sink: S, config: &Config) -> Self {
        let (shutdown, _) = watch::channel(false);

        Self {
            sink: tokio::sync::Mutex::new(Box::new(sink)),
            status: Arc::new(DeviceStatus::new()),
            bridge: Arc::new(RequestBridge::new()),
            stats: Arc::new(Mutex::new(ReceiverStats::default())),
            config: config.link.clone(),
            read_buffer_size: config.serial.read_buffer_size,
            closed: AtomicBool::new(false),
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Session over both halves of a transport, receive task running
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect<R, W>(source: R, sink: W, config: &Config) -> Self
    where
        R: ByteSource + 'static,
        W: ByteSink + 'static,
    {
        let link = Self::new(sink, config);
        link.spawn_receiver(source);
        link
    }

    /// Open the configured serial port and connect over it
    ///
    /// # Errors
    ///
    /// Returns [`CodroneError::Serial`] if the port cannot be opened
    pub fn open_serial(config: &Config) -> Result<Self> {
        let serial = DroneSerial::open(&config.serial.port, config.serial.baud_rate)?;
        let (source, sink) = serial.split();
        Ok(Self::connect(source, sink, config))
    }

    /// Start the receive task reading from `source`
    ///
    /// The task feeds every chunk to the stream parser, which updates the
    /// store and resolves waiters. It ends on EOF, on a read error, or on
    /// [`DroneLink::close`]; when the source ends, pending requests are
    /// released. Replaces any previous receive task.
    pub fn spawn_receiver<R: ByteSource + 'static>(&self, mut source: R) {
        let mut receiver = Receiver::with_dispatch(
            Arc::clone(&self.status),
            Arc::clone(&self.bridge),
            self.config.receive_timeout(),
        );
        let bridge = Arc::clone(&self.bridge);
        let stats = Arc::clone(&self.stats);
        let mut shutdown = self.shutdown.subscribe();
        let mut buf = vec![0u8; self.read_buffer_size];

        let handle = tokio::spawn(async move {
            debug!("Receive task started");

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        debug!("Receive task shutting down");
                        break;
                    }
                    result = source.read(&mut buf) => match result {
                        Ok(0) => {
                            info!("Drone link closed by peer");
                            bridge.cancel_all();
                            break;
                        }
                        Ok(n) => {
                            receiver.feed(&buf[..n]);
                            *stats.lock() = receiver.stats();
                        }
                        Err(e) => {
                            error!("Failed to read from drone link: {}", e);
                            bridge.cancel_all();
                            break;
                        }
                    }
                }
            }

            let final_stats = receiver.stats();
            info!(
                "Receive task stopped: {} frames, {} checksum mismatches, {} decode errors, {} unknown tags",
                final_stats.frames_dispatched,
                final_stats.checksum_mismatches,
                final_stats.decode_errors,
                final_stats.unknown_tags
            );
        });

        if let Some(previous) = self.task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Shared handle to the device-state store
    pub fn status(&self) -> Arc<DeviceStatus> {
        Arc::clone(&self.status)
    }

    /// Shared handle to the request bridge
    pub fn bridge(&self) -> Arc<RequestBridge> {
        Arc::clone(&self.bridge)
    }

    /// Parser counters as of the last chunk received
    pub fn receiver_stats(&self) -> ReceiverStats {
        *self.stats.lock()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Encode `payload`, frame it, and write it to the drone
    ///
    /// Writes are serialized in call order. No retry.
    ///
    /// # Errors
    ///
    /// - [`CodroneError::Encode`] before any byte is written if a field is
    ///   out of range
    /// - [`CodroneError::LinkClosed`] after [`DroneLink::close`]
    /// - [`CodroneError::Io`] if the transport fails
    pub async fn send(&self, payload: &Payload) -> Result<()> {
        if self.is_closed() {
            return Err(CodroneError::LinkClosed);
        }

        let frame = encode_frame(payload)?;

        let mut sink = self.sink.lock().await;
        sink.write_all(&frame).await?;
        sink.flush().await?;

        debug!("Sent {:?} ({} bytes)", payload.data_type(), frame.len());
        Ok(())
    }

    /// Ask the drone for one frame of `data_type` and wait for it
    ///
    /// The waiter is registered before the request goes out.
    ///
    /// # Errors
    ///
    /// Returns [`CodroneError::RequestTimeout`] if nothing arrives in time
    pub async fn request(&self, data_type: DataType, timeout: Duration) -> Result<Payload> {
        let pending = self.bridge.register(data_type);
        self.send(&Payload::Request(Request { data_type })).await?;
        pending.wait(timeout).await
    }

    /// [`DroneLink::request`] bounded by the configured `request_timeout`
    pub async fn fetch(&self, data_type: DataType) -> Result<Payload> {
        self.request(data_type, self.config.request_timeout()).await
    }

    /// Send `payload` and wait for the drone to acknowledge it
    ///
    /// Each attempt waits `ack_timeout`; up to `ack_retries` attempts.
    ///
    /// # Errors
    ///
    /// Returns [`CodroneError::RequestTimeout`] if no attempt was acknowledged
    pub async fn send_and_wait_ack(&self, payload: &Payload) -> Result<Ack> {
        let data_type = payload.data_type();

        for attempt in 1..=self.config.ack_retries {
            let pending = self.bridge.register_ack(data_type);
            self.send(payload).await?;

            match pending.wait(self.config.ack_timeout()).await {
                Ok(Payload::Ack(ack)) => return Ok(ack),
                Ok(other) => debug!("Ignoring {:?} while waiting for Ack", other.data_type()),
                Err(CodroneError::RequestTimeout(_)) => {
                    warn!(
                        "No Ack for {:?} (attempt {}/{})",
                        data_type, attempt, self.config.ack_retries
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(CodroneError::RequestTimeout(data_type))
    }

    /// Send a generic command
    pub async fn send_command(&self, command_type: CommandType, option: u8) -> Result<()> {
        self.send(&Payload::Command(Command::new(command_type, option)))
            .await
    }

    /// Take off, land, stop, flip and friends
    pub async fn trigger_flight_event(&self, event: FlightEvent) -> Result<()> {
        info!("Flight event: {:?}", event);
        self.send(&Payload::Command(Command::flight_event(event)))
            .await
    }

    /// Request `data_type` repeatedly until `predicate` holds
    ///
    /// Polls every `poll_interval`. Individual request timeouts are not
    /// errors; only the overall `timeout` is.
    ///
    /// # Errors
    ///
    /// Returns [`CodroneError::RequestTimeout`] if the predicate never held
    /// within `timeout`
    pub async fn wait_until<F>(
        &self,
        data_type: DataType,
        timeout: Duration,
        mut predicate: F,
    ) -> Result<Payload>
    where
        F: FnMut(&Payload) -> bool,
    {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(CodroneError::RequestTimeout(data_type));
            }

            let per_request = remaining.min(self.config.request_timeout());
            match self.request(data_type, per_request).await {
                Ok(payload) if predicate(&payload) => return Ok(payload),
                Ok(_) | Err(CodroneError::RequestTimeout(_)) => {}
                Err(e) => return Err(e),
            }

            let pause = self
                .config
                .poll_interval()
                .min(deadline.saturating_duration_since(Instant::now()));
            tokio::time::sleep(pause).await;
        }
    }

    /// Clear the gyro bias and wait for recalibration to finish
    ///
    /// The drone must be still on a flat surface. Polling starts after
    /// `calibration_delay`, and a not-calibrating report only counts once
    /// `min_calibration` has passed since then: the drone may answer before
    /// it has raised its calibrating flag.
    ///
    /// # Errors
    ///
    /// Returns [`CodroneError::RequestTimeout`] if calibration has not
    /// finished within `timeout` of polling
    pub async fn reset_gyro(&self, timeout: Duration) -> Result<()> {
        info!("Clearing gyro bias, keep the drone still and level");
        self.send_command(CommandType::ClearBias, 0).await?;
        tokio::time::sleep(self.config.calibration_delay()).await;

        let started = Instant::now();
        let min_calibration = self.config.min_calibration();

        self.wait_until(DataType::Error, timeout, |payload| match payload {
            Payload::Error(status) if status.is_calibrating() => {
                debug!("Calibrating ({:?} elapsed)", started.elapsed());
                false
            }
            Payload::Error(_) => started.elapsed() >= min_calibration,
            _ => false,
        })
        .await?;

        info!("Gyro calibration complete ({:?})", started.elapsed());
        Ok(())
    }

    /// End the session
    ///
    /// Releases every pending request and stops the receive task. Later
    /// sends fail with [`CodroneError::LinkClosed`].
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let canceled = self.bridge.cancel_all();
        let _ = self.shutdown.send(true);

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        info!("Drone link closed ({} pending requests canceled)", canceled);
    }
}

impl Drop for DroneLink {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
