//! # Request/Response Bridge
//!
//! Lets a caller suspend until the next frame of a given data type arrives,
//! bounded by a timeout.
//!
//! Callers register interest, the receive task resolves it. Each pending
//! request owns one half of a `tokio::sync::oneshot` channel; the table
//! holds the sending halves keyed by data type. Resolving never blocks and
//! never runs caller code, it only hands the payload over.
//!
//! Register before sending the command that triggers the response: a
//! frame dispatched after registration is always delivered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::{CodroneError, Result};
use crate::protocol::payload::{Ack, Payload};
use crate::protocol::types::DataType;

/// Default bound on how long a caller waits for a response
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// What a waiter is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WaitKey {
    /// The next frame carrying this data type
    Frame(DataType),
    /// The next `Ack` acknowledging this data type
    Ack(DataType),
}

#[derive(Debug)]
struct Waiter {
    id: u64,
    tx: oneshot::Sender<Payload>,
}

/// Registration table of in-flight waits
#[derive(Debug, Default)]
pub struct RequestBridge {
    pending: Mutex<HashMap<WaitKey, Vec<Waiter>>>,
    next_id: AtomicU64,
}

/// A registered wait for one data type
///
/// Dropping it without waiting releases the registration.
#[derive(Debug)]
pub struct PendingRequest {
    data_type: DataType,
    id: u64,
    rx: oneshot::Receiver<Payload>,
}

impl PendingRequest {
    /// Data type this request waits for
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Registration id, unique per bridge
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Suspend until the payload arrives, the timeout elapses, or the
    /// request is canceled
    ///
    /// # Errors
    ///
    /// - [`CodroneError::RequestTimeout`] if nothing arrived within `timeout`
    /// - [`CodroneError::RequestCanceled`] if the bridge released the request
    pub async fn wait(self, timeout: Duration) -> Result<Payload> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(CodroneError::RequestCanceled(self.data_type)),
            Err(_) => {
                debug!("Request for {:?} timed out after {:?}", self.data_type, timeout);
                Err(CodroneError::RequestTimeout(self.data_type))
            }
        }
    }
}

impl RequestBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the next frame of `data_type`
    pub fn register(&self, data_type: DataType) -> PendingRequest {
        self.register_key(WaitKey::Frame(data_type), data_type)
    }

    /// Register interest in the next `Ack` acknowledging `data_type`
    ///
    /// The waiter receives the `Ack` payload itself.
    pub fn register_ack(&self, data_type: DataType) -> PendingRequest {
        self.register_key(WaitKey::Ack(data_type), data_type)
    }

    fn register_key(&self, key: WaitKey, data_type: DataType) -> PendingRequest {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut pending = self.pending.lock();
        let waiters = pending.entry(key).or_default();
        // Drop registrations whose caller already gave up
        waiters.retain(|waiter| !waiter.tx.is_closed());
        waiters.push(Waiter { id, tx });

        trace!("Registered request #{} for {:?}", id, key);
        PendingRequest { data_type, id, rx }
    }

    /// Register and wait in one step
    ///
    /// Only safe against the success race if the triggering frame is sent
    /// after this call starts; use [`RequestBridge::register`] otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use codrone_link::bridge::RequestBridge;
    /// use codrone_link::error::CodroneError;
    /// use codrone_link::protocol::types::DataType;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let bridge = RequestBridge::new();
    /// let result = bridge.wait_for(DataType::Trim, Duration::from_millis(10)).await;
    /// assert!(matches!(result, Err(CodroneError::RequestTimeout(DataType::Trim))));
    /// # }
    /// ```
    pub async fn wait_for(&self, data_type: DataType, timeout: Duration) -> Result<Payload> {
        self.register(data_type).wait(timeout).await
    }

    /// Deliver `payload` to every waiter registered for its data type
    ///
    /// Newest registration first. Returns how many waiters received it;
    /// zero if nobody was waiting.
    pub fn resolve(&self, payload: Payload) -> usize {
        self.deliver(WaitKey::Frame(payload.data_type()), payload)
    }

    /// Deliver an `Ack` to waiters registered for the acknowledged data type
    pub fn resolve_ack(&self, ack: Ack) -> usize {
        self.deliver(WaitKey::Ack(ack.data_type), Payload::Ack(ack))
    }

    fn deliver(&self, key: WaitKey, payload: Payload) -> usize {
        // Take the waiters out so the lock is released before sending
        let waiters = match self.pending.lock().remove(&key) {
            Some(waiters) => waiters,
            None => return 0,
        };

        let mut delivered = 0;
        for waiter in waiters.into_iter().rev() {
            if waiter.tx.send(payload).is_ok() {
                trace!("Resolved request #{} for {:?}", waiter.id, key);
                delivered += 1;
            }
        }

        debug!("Resolved {} request(s) for {:?}", delivered, key);
        delivered
    }

    /// Release every request waiting on `data_type`
    ///
    /// Released waiters return [`CodroneError::RequestCanceled`].
    pub fn cancel(&self, data_type: DataType) -> usize {
        let mut pending = self.pending.lock();
        let released = [WaitKey::Frame(data_type), WaitKey::Ack(data_type)]
            .iter()
            .filter_map(|key| pending.remove(key))
            .map(|waiters| waiters.len())
            .sum();

        debug!("Canceled {} request(s) for {:?}", released, data_type);
        released
    }

    /// Release every pending request (session teardown)
    pub fn cancel_all(&self) -> usize {
        let released: usize = self
            .pending
            .lock()
            .drain()
            .map(|(_, waiters)| waiters.len())
            .sum();

        if released > 0 {
            debug!("Canceled all {} pending request(s)", released);
        }
        released
    }

    /// Number of callers still waiting on `data_type`
    pub fn pending_count(&self, data_type: DataType) -> usize {
        let pending = self.pending.lock();
        [WaitKey::Frame(data_type), WaitKey::Ack(data_type)]
            .iter()
            .filter_map(|key| pending.get(key))
            .flatten()
            .filter(|waiter| !waiter.tx.is_closed())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::payload::{Attitude, Trim};
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready};

    fn trim_payload() -> Payload {
        Payload::Trim(Trim {
            roll: 5,
            pitch: -3,
            yaw: 0,
            throttle: 0,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out() {
        let bridge = RequestBridge::new();
        let start = tokio::time::Instant::now();

        let result = bridge
            .wait_for(DataType::Attitude, Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(CodroneError::RequestTimeout(DataType::Attitude))));
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_register_then_resolve_succeeds() {
        let bridge = RequestBridge::new();
        let pending = bridge.register(DataType::Trim);

        // Dispatch happens before the caller starts waiting
        assert_eq!(bridge.resolve(trim_payload()), 1);

        let payload = pending.wait(DEFAULT_REQUEST_TIMEOUT).await.unwrap();
        assert_eq!(payload, trim_payload());
    }

    #[tokio::test]
    async fn test_wait_is_pending_until_resolved() {
        let bridge = RequestBridge::new();
        let pending = bridge.register(DataType::Trim);
        let mut wait = tokio_test::task::spawn(pending.wait(DEFAULT_REQUEST_TIMEOUT));

        assert_pending!(wait.poll());

        bridge.resolve(trim_payload());
        assert!(wait.is_woken());
        let payload = assert_ready!(wait.poll()).unwrap();
        assert_eq!(payload, trim_payload());
    }

    #[tokio::test]
    async fn test_resolve_without_waiters() {
        let bridge = RequestBridge::new();
        assert_eq!(bridge.resolve(trim_payload()), 0);
    }

    #[tokio::test]
    async fn test_resolve_ignores_other_tags() {
        let bridge = RequestBridge::new();
        let _pending = bridge.register(DataType::Attitude);

        assert_eq!(bridge.resolve(trim_payload()), 0);
        assert_eq!(bridge.pending_count(DataType::Attitude), 1);
    }

    #[tokio::test]
    async fn test_every_waiter_receives_once() {
        let bridge = RequestBridge::new();
        let first = bridge.register(DataType::Trim);
        let second = bridge.register(DataType::Trim);
        assert!(second.id() > first.id());

        assert_eq!(bridge.resolve(trim_payload()), 2);
        // Consumed: a second frame has nobody left to deliver to
        assert_eq!(bridge.resolve(trim_payload()), 0);

        assert!(first.wait(DEFAULT_REQUEST_TIMEOUT).await.is_ok());
        assert!(second.wait(DEFAULT_REQUEST_TIMEOUT).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_releases_waiter() {
        let bridge = RequestBridge::new();
        let pending = bridge.register(DataType::Trim);
        let other = bridge.register(DataType::Attitude);

        assert_eq!(bridge.cancel(DataType::Trim), 1);

        let result = pending.wait(DEFAULT_REQUEST_TIMEOUT).await;
        assert!(matches!(result, Err(CodroneError::RequestCanceled(DataType::Trim))));
        assert_eq!(bridge.pending_count(DataType::Attitude), 1);
        drop(other);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_releases_waiters_promptly() {
        let bridge = Arc::new(RequestBridge::new());
        let waits: Vec<_> = [DataType::Trim, DataType::Attitude, DataType::State]
            .into_iter()
            .map(|data_type| {
                let bridge = Arc::clone(&bridge);
                tokio::spawn(async move {
                    bridge.wait_for(data_type, Duration::from_secs(60)).await
                })
            })
            .collect();

        // Let every task register
        tokio::task::yield_now().await;
        while [DataType::Trim, DataType::Attitude, DataType::State]
            .iter()
            .any(|dt| bridge.pending_count(*dt) == 0)
        {
            tokio::task::yield_now().await;
        }

        let start = tokio::time::Instant::now();
        assert_eq!(bridge.cancel_all(), 3);

        for wait in waits {
            let result = wait.await.unwrap();
            assert!(matches!(result, Err(CodroneError::RequestCanceled(_))));
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_dropped_request_is_pruned() {
        let bridge = RequestBridge::new();
        let pending = bridge.register(DataType::Trim);
        assert_eq!(bridge.pending_count(DataType::Trim), 1);

        drop(pending);
        assert_eq!(bridge.pending_count(DataType::Trim), 0);
        assert_eq!(bridge.resolve(trim_payload()), 0);
    }

    #[tokio::test]
    async fn test_ack_waiters_keyed_by_acknowledged_type() {
        let bridge = RequestBridge::new();
        let ack_wait = bridge.register_ack(DataType::LightMode);
        let frame_wait = bridge.register(DataType::Ack);

        let ack = Ack {
            system_time: 1,
            data_type: DataType::LightMode,
            crc16: 0x1234,
        };

        // An Ack for a different type does not release it
        let unrelated = Ack {
            data_type: DataType::Buzzer,
            ..ack
        };
        assert_eq!(bridge.resolve_ack(unrelated), 0);

        assert_eq!(bridge.resolve_ack(ack), 1);
        assert_eq!(bridge.resolve(Payload::Ack(ack)), 1);

        assert_eq!(
            ack_wait.wait(DEFAULT_REQUEST_TIMEOUT).await.unwrap(),
            Payload::Ack(ack)
        );
        assert!(frame_wait.wait(DEFAULT_REQUEST_TIMEOUT).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_frame_after_timeout_is_not_delivered() {
        let bridge = RequestBridge::new();
        let result = bridge
            .wait_for(DataType::Attitude, Duration::from_millis(10))
            .await;
        assert!(result.is_err());

        let attitude = Payload::Attitude(Attitude::default());
        assert_eq!(bridge.resolve(attitude), 0);
    }
}
