//! # Payload Decoder
//!
//! Decodes payload bytes received from the drone into typed records.
//!
//! [`decode_payload`] is the tag→codec mapping. Supporting a new data type
//! means adding a record, a [`Decode`] impl and one arm here; the receiver
//! never changes.

use bytes::Buf;

use super::payload::*;
use super::types::*;
use crate::error::DecodeError;

/// Deserialize a record from its wire layout
pub trait Decode: Layout + Sized {
    /// Read one record from `buf`
    ///
    /// Callers guarantee `buf` holds at least `SIZE` bytes.
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError>;
}

fn check_range<T: Into<i64> + Copy>(
    field: &'static str,
    value: T,
    min: T,
    max: T,
) -> Result<T, DecodeError> {
    let wide = value.into();
    if wide < min.into() || wide > max.into() {
        return Err(DecodeError::OutOfRange { field, value: wide });
    }
    Ok(value)
}

fn check_finite(field: &'static str, value: f32) -> Result<f32, DecodeError> {
    if !value.is_finite() {
        return Err(DecodeError::NotFinite { field });
    }
    Ok(value)
}

/// Decode exactly one record from `bytes`, rejecting any size mismatch
fn decode_exact<T: Decode>(data_type: DataType, bytes: &[u8]) -> Result<T, DecodeError> {
    if bytes.len() != T::SIZE {
        return Err(DecodeError::LengthMismatch {
            data_type,
            expected: T::SIZE,
            actual: bytes.len(),
        });
    }

    let mut buf = bytes;
    T::decode_from(&mut buf)
}

impl Decode for Ping {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Ping {
            system_time: buf.get_u64_le(),
        })
    }
}

impl Decode for Ack {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Ack {
            system_time: buf.get_u64_le(),
            data_type: DataType::from_byte(buf.get_u8()),
            crc16: buf.get_u16_le(),
        })
    }
}

impl Decode for ErrorStatus {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(ErrorStatus {
            system_time: buf.get_u64_le(),
            sensor: SensorErrorFlags(buf.get_u32_le()),
            state: StateErrorFlags(buf.get_u32_le()),
        })
    }
}

impl Decode for Request {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Request {
            data_type: DataType::from_byte(buf.get_u8()),
        })
    }
}

impl Decode for Information {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        let mode_update = ModeUpdate::from_byte(buf.get_u8());
        let model_number = buf.get_u32_le();
        let version = Version {
            build: buf.get_u16_le(),
            minor: buf.get_u8(),
            major: buf.get_u8(),
        };
        let year = buf.get_u16_le();
        let month = check_range("month", buf.get_u8(), 0, 12)?;
        let day = check_range("day", buf.get_u8(), 0, 31)?;

        Ok(Information {
            mode_update,
            model_number,
            version,
            year,
            month,
            day,
        })
    }
}

impl Decode for Control {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Control {
            roll: check_range("roll", buf.get_i8(), CONTROL_MIN, CONTROL_MAX)?,
            pitch: check_range("pitch", buf.get_i8(), CONTROL_MIN, CONTROL_MAX)?,
            yaw: check_range("yaw", buf.get_i8(), CONTROL_MIN, CONTROL_MAX)?,
            throttle: check_range("throttle", buf.get_i8(), CONTROL_MIN, CONTROL_MAX)?,
        })
    }
}

impl Decode for Command {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Command {
            command_type: CommandType::from_byte(buf.get_u8()),
            option: buf.get_u8(),
        })
    }
}

impl Decode for LightManual {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(LightManual {
            flags: buf.get_u16_le(),
            brightness: buf.get_u8(),
        })
    }
}

impl Decode for LightMode {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(LightMode {
            mode: LightModeDrone::from_byte(buf.get_u8()),
            interval: buf.get_u16_le(),
            color: Color {
                r: buf.get_u8(),
                g: buf.get_u8(),
                b: buf.get_u8(),
            },
        })
    }
}

impl Decode for State {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(State {
            mode_system: ModeSystem::from_byte(buf.get_u8()),
            mode_flight: ModeFlight::from_byte(buf.get_u8()),
            mode_control_flight: ModeControlFlight::from_byte(buf.get_u8()),
            mode_movement: ModeMovement::from_byte(buf.get_u8()),
            headless: Headless::from_byte(buf.get_u8()),
            control_speed: buf.get_u8(),
            sensor_orientation: SensorOrientation::from_byte(buf.get_u8()),
            battery: check_range("battery", buf.get_u8(), 0, BATTERY_MAX)?,
        })
    }
}

impl Decode for Attitude {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Attitude {
            roll: check_range("roll", buf.get_i16_le(), ANGLE_MIN, ANGLE_MAX)?,
            pitch: check_range("pitch", buf.get_i16_le(), ANGLE_MIN, ANGLE_MAX)?,
            yaw: check_range("yaw", buf.get_i16_le(), ANGLE_MIN, ANGLE_MAX)?,
        })
    }
}

impl Decode for Position {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Position {
            x: check_finite("x", buf.get_f32_le())?,
            y: check_finite("y", buf.get_f32_le())?,
            z: check_finite("z", buf.get_f32_le())?,
        })
    }
}

impl Decode for Altitude {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Altitude {
            temperature: check_finite("temperature", buf.get_f32_le())?,
            pressure: check_finite("pressure", buf.get_f32_le())?,
            altitude: check_finite("altitude", buf.get_f32_le())?,
            range_height: check_finite("range_height", buf.get_f32_le())?,
        })
    }
}

impl Decode for Motion {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Motion {
            accel_x: buf.get_i16_le(),
            accel_y: buf.get_i16_le(),
            accel_z: buf.get_i16_le(),
            gyro_roll: buf.get_i16_le(),
            gyro_pitch: buf.get_i16_le(),
            gyro_yaw: buf.get_i16_le(),
            angle_roll: check_range("angle_roll", buf.get_i16_le(), ANGLE_MIN, ANGLE_MAX)?,
            angle_pitch: check_range("angle_pitch", buf.get_i16_le(), ANGLE_MIN, ANGLE_MAX)?,
            angle_yaw: check_range("angle_yaw", buf.get_i16_le(), ANGLE_MIN, ANGLE_MAX)?,
        })
    }
}

impl Decode for Range {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Range {
            left: buf.get_i16_le(),
            front: buf.get_i16_le(),
            right: buf.get_i16_le(),
            rear: buf.get_i16_le(),
            top: buf.get_i16_le(),
            bottom: buf.get_i16_le(),
        })
    }
}

impl Decode for Flow {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Flow {
            x: check_finite("x", buf.get_f32_le())?,
            y: check_finite("y", buf.get_f32_le())?,
            z: check_finite("z", buf.get_f32_le())?,
        })
    }
}

impl Decode for RawFlow {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(RawFlow {
            x: check_finite("x", buf.get_f32_le())?,
            y: check_finite("y", buf.get_f32_le())?,
        })
    }
}

impl Decode for Trim {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Trim {
            roll: check_range("roll", buf.get_i16_le(), TRIM_MIN, TRIM_MAX)?,
            pitch: check_range("pitch", buf.get_i16_le(), TRIM_MIN, TRIM_MAX)?,
            yaw: check_range("yaw", buf.get_i16_le(), TRIM_MIN, TRIM_MAX)?,
            throttle: check_range("throttle", buf.get_i16_le(), TRIM_MIN, TRIM_MAX)?,
        })
    }
}

impl Decode for Buzzer {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Buzzer {
            mode: BuzzerMode::from_byte(buf.get_u8()),
            value: buf.get_u16_le(),
            time: buf.get_u16_le(),
        })
    }
}

impl Decode for RawMotion {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(RawMotion {
            accel_x: buf.get_i16_le(),
            accel_y: buf.get_i16_le(),
            accel_z: buf.get_i16_le(),
            gyro_roll: buf.get_i16_le(),
            gyro_pitch: buf.get_i16_le(),
            gyro_yaw: buf.get_i16_le(),
        })
    }
}

impl Decode for Button {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Button {
            button: buf.get_u16_le(),
            event: ButtonEvent::from_byte(buf.get_u8()),
        })
    }
}

impl Decode for JoystickBlock {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(JoystickBlock {
            x: buf.get_i8(),
            y: buf.get_i8(),
            direction: JoystickDirection::from_byte(buf.get_u8()),
            event: JoystickEvent::from_byte(buf.get_u8()),
        })
    }
}

impl Decode for Joystick {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Joystick {
            left: JoystickBlock::decode_from(buf)?,
            right: JoystickBlock::decode_from(buf)?,
        })
    }
}

impl Decode for CardColor {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        let mut hsvl = [[0u16; 4]; 2];
        for sensor in hsvl.iter_mut() {
            for value in sensor.iter_mut() {
                *value = buf.get_u16_le();
            }
        }

        Ok(CardColor {
            hsvl,
            color: [
                CardColorIndex::from_byte(buf.get_u8()),
                CardColorIndex::from_byte(buf.get_u8()),
            ],
            card: buf.get_u8(),
        })
    }
}

/// Decode the payload of a frame tagged `data_type`
///
/// # Arguments
///
/// * `data_type` - Tag from the frame header
/// * `bytes` - Exactly the payload bytes (header and CRC stripped)
///
/// # Errors
///
/// Returns error if:
/// - The tag has no modeled layout ([`DecodeError::UnknownTag`])
/// - The byte count does not match the layout
/// - A bounded field is outside its declared range
///
/// # Examples
///
/// ```
/// use codrone_link::protocol::decoder::decode_payload;
/// use codrone_link::protocol::payload::{Payload, Trim};
/// use codrone_link::protocol::types::DataType;
///
/// let bytes = [0x05, 0x00, 0xFD, 0xFF, 0x00, 0x00, 0x00, 0x00];
/// let payload = decode_payload(DataType::Trim, &bytes)?;
/// assert_eq!(payload, Payload::Trim(Trim { roll: 5, pitch: -3, yaw: 0, throttle: 0 }));
/// # Ok::<(), codrone_link::error::DecodeError>(())
/// ```
pub fn decode_payload(data_type: DataType, bytes: &[u8]) -> Result<Payload, DecodeError> {
    let payload = match data_type {
        DataType::Ping => Payload::Ping(decode_exact(data_type, bytes)?),
        DataType::Ack => Payload::Ack(decode_exact(data_type, bytes)?),
        DataType::Error => Payload::Error(decode_exact(data_type, bytes)?),
        DataType::Request => Payload::Request(decode_exact(data_type, bytes)?),
        DataType::Information => Payload::Information(decode_exact(data_type, bytes)?),
        DataType::Control => Payload::Control(decode_exact(data_type, bytes)?),
        DataType::Command => Payload::Command(decode_exact(data_type, bytes)?),
        DataType::LightManual => Payload::LightManual(decode_exact(data_type, bytes)?),
        DataType::LightMode => Payload::LightMode(decode_exact(data_type, bytes)?),
        DataType::LightDefault => Payload::LightDefault(decode_exact(data_type, bytes)?),
        DataType::State => Payload::State(decode_exact(data_type, bytes)?),
        DataType::Attitude => Payload::Attitude(decode_exact(data_type, bytes)?),
        DataType::Position => Payload::Position(decode_exact(data_type, bytes)?),
        DataType::Altitude => Payload::Altitude(decode_exact(data_type, bytes)?),
        DataType::Motion => Payload::Motion(decode_exact(data_type, bytes)?),
        DataType::Range => Payload::Range(decode_exact(data_type, bytes)?),
        DataType::Flow => Payload::Flow(decode_exact(data_type, bytes)?),
        DataType::RawFlow => Payload::RawFlow(decode_exact(data_type, bytes)?),
        DataType::Trim => Payload::Trim(decode_exact(data_type, bytes)?),
        DataType::Buzzer => Payload::Buzzer(decode_exact(data_type, bytes)?),
        DataType::RawMotion => Payload::RawMotion(decode_exact(data_type, bytes)?),
        DataType::Button => Payload::Button(decode_exact(data_type, bytes)?),
        DataType::Joystick => Payload::Joystick(decode_exact(data_type, bytes)?),
        DataType::CardColor => Payload::CardColor(decode_exact(data_type, bytes)?),
        other => return Err(DecodeError::UnknownTag(other.to_byte())),
    };

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encoder::encode_payload;

    fn round_trip(payload: Payload) {
        let bytes = encode_payload(&payload).unwrap();
        let decoded = decode_payload(payload.data_type(), &bytes).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_round_trip_every_layout() {
        let light = LightMode {
            mode: LightModeDrone::BodyRainbow,
            interval: 500,
            color: Color { r: 1, g: 2, b: 3 },
        };

        let payloads = vec![
            Payload::Ping(Ping {
                system_time: 0x0102_0304_0506_0708,
            }),
            Payload::Ack(Ack {
                system_time: 99,
                data_type: DataType::LightMode,
                crc16: 0xBEEF,
            }),
            Payload::Error(ErrorStatus {
                system_time: 12345,
                sensor: SensorErrorFlags(SensorErrorFlags::MOTION_CALIBRATING),
                state: StateErrorFlags(StateErrorFlags::LOW_BATTERY),
            }),
            Payload::Request(Request {
                data_type: DataType::Attitude,
            }),
            Payload::Information(Information {
                mode_update: ModeUpdate::RunApplication,
                model_number: 0x000C_1002,
                version: Version {
                    build: 12,
                    minor: 4,
                    major: 25,
                },
                year: 2024,
                month: 6,
                day: 30,
            }),
            Payload::Control(Control {
                roll: -100,
                pitch: 100,
                yaw: 0,
                throttle: 42,
            }),
            Payload::Command(Command::flight_event(FlightEvent::TakeOff)),
            Payload::LightManual(LightManual {
                flags: 0x00FF,
                brightness: 200,
            }),
            Payload::LightMode(light),
            Payload::LightDefault(light),
            Payload::State(State {
                mode_system: ModeSystem::Running,
                mode_flight: ModeFlight::Flight,
                mode_control_flight: ModeControlFlight::Attitude,
                mode_movement: ModeMovement::Hovering,
                headless: Headless::Normal,
                control_speed: 2,
                sensor_orientation: SensorOrientation::Normal,
                battery: 87,
            }),
            Payload::Attitude(Attitude {
                roll: -180,
                pitch: 45,
                yaw: 180,
            }),
            Payload::Position(Position {
                x: 1.5,
                y: -0.25,
                z: 0.8,
            }),
            Payload::Altitude(Altitude {
                temperature: 24.5,
                pressure: 101_325.0,
                altitude: 12.75,
                range_height: 0.5,
            }),
            Payload::Motion(Motion {
                accel_x: -1000,
                accel_y: 20,
                accel_z: 16384,
                gyro_roll: 3,
                gyro_pitch: -4,
                gyro_yaw: 5,
                angle_roll: 10,
                angle_pitch: -10,
                angle_yaw: 90,
            }),
            Payload::Range(Range {
                left: 100,
                front: 999,
                right: -1,
                rear: 0,
                top: 300,
                bottom: 45,
            }),
            Payload::Flow(Flow {
                x: 0.1,
                y: 0.2,
                z: 0.3,
            }),
            Payload::RawFlow(RawFlow { x: -3.0, y: 4.0 }),
            Payload::Trim(Trim {
                roll: 5,
                pitch: -3,
                yaw: 0,
                throttle: 0,
            }),
            Payload::Buzzer(Buzzer {
                mode: BuzzerMode::Scale,
                value: 45,
                time: 250,
            }),
            Payload::RawMotion(RawMotion {
                accel_x: 512,
                accel_y: -512,
                accel_z: 16000,
                gyro_roll: -7,
                gyro_pitch: 8,
                gyro_yaw: 0,
            }),
            Payload::Button(Button {
                button: 0x0041,
                event: ButtonEvent::Press,
            }),
            Payload::Joystick(Joystick {
                left: JoystickBlock {
                    x: -100,
                    y: 25,
                    direction: JoystickDirection::BottomLeft,
                    event: JoystickEvent::Out,
                },
                right: JoystickBlock {
                    x: 0,
                    y: 0,
                    direction: JoystickDirection::MiddleCenter,
                    event: JoystickEvent::None,
                },
            }),
            Payload::CardColor(CardColor {
                hsvl: [[210, 80, 95, 40], [30, 60, 70, 50]],
                color: [CardColorIndex::Blue, CardColorIndex::Yellow],
                card: 0x63,
            }),
        ];

        for payload in payloads {
            round_trip(payload);
        }
    }

    #[test]
    fn test_decode_length_mismatch() {
        let result = decode_payload(DataType::Trim, &[0u8; 6]);
        assert_eq!(
            result,
            Err(DecodeError::LengthMismatch {
                data_type: DataType::Trim,
                expected: 8,
                actual: 6
            })
        );

        // Longer than the layout is rejected too
        assert!(decode_payload(DataType::Attitude, &[0u8; 7]).is_err());
    }

    #[test]
    fn test_decode_trim_out_of_range() {
        // roll = 200
        let bytes = [0xC8, 0x00, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            decode_payload(DataType::Trim, &bytes),
            Err(DecodeError::OutOfRange {
                field: "roll",
                value: 200
            })
        );
    }

    #[test]
    fn test_decode_battery_out_of_range() {
        let bytes = [0x12, 0x10, 0x10, 0x01, 0x02, 0x01, 0x01, 150];
        assert!(matches!(
            decode_payload(DataType::State, &bytes),
            Err(DecodeError::OutOfRange { field: "battery", value: 150 })
        ));
    }

    #[test]
    fn test_decode_attitude_out_of_range() {
        // yaw = 400
        let bytes = [0, 0, 0, 0, 0x90, 0x01];
        assert!(matches!(
            decode_payload(DataType::Attitude, &bytes),
            Err(DecodeError::OutOfRange { field: "yaw", value: 400 })
        ));
    }

    #[test]
    fn test_decode_position_nan() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&f32::NAN.to_le_bytes());
        bytes.extend_from_slice(&0f32.to_le_bytes());
        bytes.extend_from_slice(&0f32.to_le_bytes());
        assert_eq!(
            decode_payload(DataType::Position, &bytes),
            Err(DecodeError::NotFinite { field: "x" })
        );
    }

    #[test]
    fn test_decode_unknown_enum_ordinal() {
        // mode_flight = 0x99 is not a known ordinal
        let bytes = [0x12, 0x99, 0x10, 0x01, 0x02, 0x01, 0x01, 50];
        let payload = decode_payload(DataType::State, &bytes).unwrap();
        match payload {
            Payload::State(state) => {
                assert_eq!(state.mode_flight, ModeFlight::Unknown(0x99));
                assert_eq!(state.battery, 50);
            }
            other => panic!("Expected State payload, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert_eq!(
            decode_payload(DataType::Unknown(0xEE), &[1, 2, 3]),
            Err(DecodeError::UnknownTag(0xEE))
        );
        // Known to the firmware but not modeled by the host
        assert_eq!(
            decode_payload(DataType::CardRaw, &[0u8; 4]),
            Err(DecodeError::UnknownTag(0x92))
        );
    }

    #[test]
    fn test_decode_card_color_sensor_frame() {
        let mut bytes = Vec::new();
        for value in [120u16, 200, 180, 90, 0, 0, 10, 5] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&[0x02, 0x08, 0x28]);

        match decode_payload(DataType::CardColor, &bytes).unwrap() {
            Payload::CardColor(card) => {
                assert_eq!(card.hsvl[0], [120, 200, 180, 90]);
                assert_eq!(card.hsvl[1], [0, 0, 10, 5]);
                assert_eq!(card.front(), CardColorIndex::Red);
                assert_eq!(card.rear(), CardColorIndex::Black);
                assert_eq!(card.card, 0x28);
            }
            other => panic!("Expected CardColor payload, got: {:?}", other),
        }

        assert!(matches!(
            decode_payload(DataType::CardColor, &[0u8; 18]),
            Err(DecodeError::LengthMismatch { expected: 19, .. })
        ));
    }

    #[test]
    fn test_decode_controller_input() {
        let button = decode_payload(DataType::Button, &[0x01, 0x00, 0x01]).unwrap();
        assert_eq!(
            button,
            Payload::Button(Button {
                button: 0x0001,
                event: ButtonEvent::Down,
            })
        );

        // left x = -1, right y = -100; unknown direction ordinal preserved
        let bytes = [0xFF, 0x00, 0x77, 0x02, 0x00, 0x9C, 0x42, 0x01];
        match decode_payload(DataType::Joystick, &bytes).unwrap() {
            Payload::Joystick(joystick) => {
                assert_eq!(joystick.left.x, -1);
                assert_eq!(joystick.left.direction, JoystickDirection::Unknown(0x77));
                assert_eq!(joystick.left.event, JoystickEvent::Stay);
                assert_eq!(joystick.right.y, -100);
                assert_eq!(joystick.right.direction, JoystickDirection::BottomCenter);
            }
            other => panic!("Expected Joystick payload, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_error_status_little_endian() {
        let bytes = [
            0x01, 0, 0, 0, 0, 0, 0, 0, // system_time = 1
            0x08, 0, 0, 0, // sensor = MOTION_CALIBRATING
            0x08, 0, 0, 0, // state = LOW_BATTERY
        ];
        match decode_payload(DataType::Error, &bytes).unwrap() {
            Payload::Error(status) => {
                assert_eq!(status.system_time, 1);
                assert!(status.is_calibrating());
                assert!(status.is_low_battery());
            }
            other => panic!("Expected Error payload, got: {:?}", other),
        }
    }
}
