//! # Device-State Store
//!
//! Last-known value of every telemetry payload received this session,
//! keyed by data type.
//!
//! The receive task is the only writer. Callers read snapshots at any time
//! and see either the previous value or the new one, never a mix of both.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::trace;

use crate::protocol::payload::*;
use crate::protocol::types::DataType;

#[derive(Debug, Clone, Copy)]
struct Slot {
    payload: Payload,
    updated: Instant,
}

/// Shared telemetry cache for one link session
///
/// Wrap in an `Arc` to share between the receive task and callers.
#[derive(Debug, Default)]
pub struct DeviceStatus {
    slots: RwLock<HashMap<DataType, Slot>>,
}

macro_rules! typed_accessor {
    ($(#[$meta:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $name(&self) -> Option<$ty> {
            match self.snapshot(DataType::$variant)? {
                Payload::$variant(value) => Some(value),
                _ => None,
            }
        }
    };
}

impl DeviceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored value for the payload's data type
    ///
    /// Last writer wins.
    pub fn update(&self, payload: Payload) {
        let data_type = payload.data_type();
        let slot = Slot {
            payload,
            updated: Instant::now(),
        };

        self.slots.write().insert(data_type, slot);
        trace!("Status updated: {:?}", data_type);
    }

    /// Most recent payload received for `data_type`
    ///
    /// Returns `None` if no frame of that type has arrived this session.
    pub fn snapshot(&self, data_type: DataType) -> Option<Payload> {
        self.slots.read().get(&data_type).map(|slot| slot.payload)
    }

    /// When the value for `data_type` was last replaced
    pub fn last_updated(&self, data_type: DataType) -> Option<Instant> {
        self.slots.read().get(&data_type).map(|slot| slot.updated)
    }

    /// Forget everything (session restart)
    pub fn clear(&self) {
        self.slots.write().clear();
    }

    /// Number of data types with a stored value
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    typed_accessor!(ping, Ping, Ping);
    typed_accessor!(
        /// Latest sensor/state error report
        error,
        Error,
        ErrorStatus
    );
    typed_accessor!(information, Information, Information);
    typed_accessor!(state, State, State);
    typed_accessor!(attitude, Attitude, Attitude);
    typed_accessor!(position, Position, Position);
    typed_accessor!(altitude, Altitude, Altitude);
    typed_accessor!(motion, Motion, Motion);
    typed_accessor!(range, Range, Range);
    typed_accessor!(flow, Flow, Flow);
    typed_accessor!(raw_flow, RawFlow, RawFlow);
    typed_accessor!(trim, Trim, Trim);
    typed_accessor!(raw_motion, RawMotion, RawMotion);
    typed_accessor!(
        /// Latest color sensor reading from the card reader
        card_color,
        CardColor,
        CardColor
    );
    typed_accessor!(button, Button, Button);
    typed_accessor!(joystick, Joystick, Joystick);

    /// Battery level in percent from the latest `State` frame
    pub fn battery(&self) -> Option<u8> {
        self.state().map(|state| state.battery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn state_with_battery(battery: u8) -> State {
        State {
            mode_system: ModeSystem::Running,
            mode_flight: ModeFlight::Ready,
            mode_control_flight: ModeControlFlight::Attitude,
            mode_movement: ModeMovement::Ready,
            headless: Headless::Normal,
            control_speed: 1,
            sensor_orientation: SensorOrientation::Normal,
            battery,
        }
    }

    #[test]
    fn test_empty_store() {
        let status = DeviceStatus::new();
        assert!(status.is_empty());
        assert_eq!(status.snapshot(DataType::Trim), None);
        assert_eq!(status.trim(), None);
        assert_eq!(status.battery(), None);
        assert_eq!(status.last_updated(DataType::Trim), None);
    }

    #[test]
    fn test_update_and_snapshot() {
        let status = DeviceStatus::new();
        let trim = Trim {
            roll: 5,
            pitch: -3,
            yaw: 0,
            throttle: 0,
        };

        status.update(Payload::Trim(trim));

        assert_eq!(status.snapshot(DataType::Trim), Some(Payload::Trim(trim)));
        assert_eq!(status.trim(), Some(trim));
        assert_eq!(status.len(), 1);
    }

    #[test]
    fn test_last_writer_wins() {
        let status = DeviceStatus::new();
        status.update(Payload::Attitude(Attitude {
            roll: 1,
            pitch: 2,
            yaw: 3,
        }));
        status.update(Payload::Attitude(Attitude {
            roll: 10,
            pitch: 20,
            yaw: 30,
        }));

        let attitude = status.attitude().unwrap();
        assert_eq!(attitude.roll, 10);
        assert_eq!(attitude.yaw, 30);
        assert_eq!(status.len(), 1);
    }

    #[test]
    fn test_battery_from_state() {
        let status = DeviceStatus::new();
        status.update(Payload::State(state_with_battery(73)));
        assert_eq!(status.battery(), Some(73));
        assert!(status.state().unwrap().is_ready());
    }

    #[test]
    fn test_tags_are_independent() {
        let status = DeviceStatus::new();
        status.update(Payload::Trim(Trim::default()));
        status.update(Payload::Range(Range {
            bottom: 120,
            ..Range::default()
        }));

        assert_eq!(status.range().unwrap().bottom, 120);
        assert_eq!(status.trim(), Some(Trim::default()));
        assert_eq!(status.attitude(), None);
    }

    #[test]
    fn test_sensor_and_controller_accessors() {
        let status = DeviceStatus::new();
        let card = CardColor {
            hsvl: [[10, 20, 30, 40], [50, 60, 70, 80]],
            color: [CardColorIndex::Green, CardColorIndex::White],
            card: 0x41,
        };
        let button = Button {
            button: 0x0004,
            event: ButtonEvent::Up,
        };
        let raw = RawMotion {
            accel_z: 16384,
            ..RawMotion::default()
        };

        status.update(Payload::CardColor(card));
        status.update(Payload::Button(button));
        status.update(Payload::RawMotion(raw));

        assert_eq!(status.card_color(), Some(card));
        assert_eq!(status.card_color().unwrap().front(), CardColorIndex::Green);
        assert_eq!(status.button(), Some(button));
        assert_eq!(status.raw_motion(), Some(raw));
        assert_eq!(status.joystick(), None);
        assert_eq!(status.motion(), None);
    }

    #[test]
    fn test_clear() {
        let status = DeviceStatus::new();
        status.update(Payload::Trim(Trim::default()));
        status.clear();
        assert!(status.is_empty());
        assert_eq!(status.trim(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_updated_advances() {
        let status = DeviceStatus::new();
        status.update(Payload::Trim(Trim::default()));
        let first = status.last_updated(DataType::Trim).unwrap();

        tokio::time::advance(Duration::from_millis(50)).await;
        status.update(Payload::Trim(Trim::default()));
        let second = status.last_updated(DataType::Trim).unwrap();

        assert_eq!(second - first, Duration::from_millis(50));
    }

    #[test]
    fn test_concurrent_readers_see_whole_values() {
        let status = Arc::new(DeviceStatus::new());
        let writer = {
            let status = Arc::clone(&status);
            std::thread::spawn(move || {
                for i in 0..1000i16 {
                    let v = i % 100;
                    status.update(Payload::Trim(Trim {
                        roll: v,
                        pitch: v,
                        yaw: v,
                        throttle: v,
                    }));
                }
            })
        };

        for _ in 0..1000 {
            if let Some(trim) = status.trim() {
                assert_eq!(trim.roll, trim.pitch);
                assert_eq!(trim.yaw, trim.throttle);
                assert_eq!(trim.roll, trim.yaw);
            }
        }

        writer.join().unwrap();
    }
}
