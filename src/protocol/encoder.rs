//! # Payload Encoder
//!
//! Encodes typed payload records into their little-endian wire layout and
//! wraps them into complete frames.

use bytes::BufMut;

use super::frame::build_frame;
use super::payload::*;
use super::types::*;
use crate::error::EncodeError;

/// Serialize a record into its wire layout
pub trait Encode: Layout {
    /// Append this record's bytes to `buf`
    ///
    /// Implementations validate every bounded field before writing, so a
    /// failed encode leaves `buf` untouched.
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError>;

    /// Encode into a fresh buffer of exactly `SIZE` bytes
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        self.encode_into(&mut buf)?;
        debug_assert_eq!(buf.len(), Self::SIZE);
        Ok(buf)
    }
}

fn check_range<T: Into<i64> + Copy>(
    field: &'static str,
    value: T,
    min: T,
    max: T,
) -> Result<(), EncodeError> {
    let (value, min, max) = (value.into(), min.into(), max.into());
    if value < min || value > max {
        return Err(EncodeError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_finite(field: &'static str, value: f32) -> Result<(), EncodeError> {
    if !value.is_finite() {
        return Err(EncodeError::NotFinite { field });
    }
    Ok(())
}

impl Encode for Ping {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.put_u64_le(self.system_time);
        Ok(())
    }
}

impl Encode for Ack {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.put_u64_le(self.system_time);
        buf.put_u8(self.data_type.to_byte());
        buf.put_u16_le(self.crc16);
        Ok(())
    }
}

impl Encode for ErrorStatus {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.put_u64_le(self.system_time);
        buf.put_u32_le(self.sensor.0);
        buf.put_u32_le(self.state.0);
        Ok(())
    }
}

impl Encode for Request {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.put_u8(self.data_type.to_byte());
        Ok(())
    }
}

impl Encode for Information {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        check_range("month", self.month, 0, 12)?;
        check_range("day", self.day, 0, 31)?;

        buf.put_u8(self.mode_update.to_byte());
        buf.put_u32_le(self.model_number);
        buf.put_u16_le(self.version.build);
        buf.put_u8(self.version.minor);
        buf.put_u8(self.version.major);
        buf.put_u16_le(self.year);
        buf.put_u8(self.month);
        buf.put_u8(self.day);
        Ok(())
    }
}

impl Encode for Control {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        for (field, value) in [
            ("roll", self.roll),
            ("pitch", self.pitch),
            ("yaw", self.yaw),
            ("throttle", self.throttle),
        ] {
            check_range(field, value, CONTROL_MIN, CONTROL_MAX)?;
        }

        buf.put_i8(self.roll);
        buf.put_i8(self.pitch);
        buf.put_i8(self.yaw);
        buf.put_i8(self.throttle);
        Ok(())
    }
}

impl Encode for Command {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.put_u8(self.command_type.to_byte());
        buf.put_u8(self.option);
        Ok(())
    }
}

impl Encode for LightManual {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.put_u16_le(self.flags);
        buf.put_u8(self.brightness);
        Ok(())
    }
}

impl Encode for LightMode {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.put_u8(self.mode.to_byte());
        buf.put_u16_le(self.interval);
        buf.put_u8(self.color.r);
        buf.put_u8(self.color.g);
        buf.put_u8(self.color.b);
        Ok(())
    }
}

impl Encode for State {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        check_range("battery", self.battery, 0, BATTERY_MAX)?;

        buf.put_u8(self.mode_system.to_byte());
        buf.put_u8(self.mode_flight.to_byte());
        buf.put_u8(self.mode_control_flight.to_byte());
        buf.put_u8(self.mode_movement.to_byte());
        buf.put_u8(self.headless.to_byte());
        buf.put_u8(self.control_speed);
        buf.put_u8(self.sensor_orientation.to_byte());
        buf.put_u8(self.battery);
        Ok(())
    }
}

impl Encode for Attitude {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        check_range("roll", self.roll, ANGLE_MIN, ANGLE_MAX)?;
        check_range("pitch", self.pitch, ANGLE_MIN, ANGLE_MAX)?;
        check_range("yaw", self.yaw, ANGLE_MIN, ANGLE_MAX)?;

        buf.put_i16_le(self.roll);
        buf.put_i16_le(self.pitch);
        buf.put_i16_le(self.yaw);
        Ok(())
    }
}

impl Encode for Position {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        check_finite("x", self.x)?;
        check_finite("y", self.y)?;
        check_finite("z", self.z)?;

        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
        buf.put_f32_le(self.z);
        Ok(())
    }
}

impl Encode for Altitude {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        check_finite("temperature", self.temperature)?;
        check_finite("pressure", self.pressure)?;
        check_finite("altitude", self.altitude)?;
        check_finite("range_height", self.range_height)?;

        buf.put_f32_le(self.temperature);
        buf.put_f32_le(self.pressure);
        buf.put_f32_le(self.altitude);
        buf.put_f32_le(self.range_height);
        Ok(())
    }
}

impl Encode for Motion {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        check_range("angle_roll", self.angle_roll, ANGLE_MIN, ANGLE_MAX)?;
        check_range("angle_pitch", self.angle_pitch, ANGLE_MIN, ANGLE_MAX)?;
        check_range("angle_yaw", self.angle_yaw, ANGLE_MIN, ANGLE_MAX)?;

        for value in [
            self.accel_x,
            self.accel_y,
            self.accel_z,
            self.gyro_roll,
            self.gyro_pitch,
            self.gyro_yaw,
            self.angle_roll,
            self.angle_pitch,
            self.angle_yaw,
        ] {
            buf.put_i16_le(value);
        }
        Ok(())
    }
}

impl Encode for Range {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        for value in [
            self.left,
            self.front,
            self.right,
            self.rear,
            self.top,
            self.bottom,
        ] {
            buf.put_i16_le(value);
        }
        Ok(())
    }
}

impl Encode for Flow {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        check_finite("x", self.x)?;
        check_finite("y", self.y)?;
        check_finite("z", self.z)?;

        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
        buf.put_f32_le(self.z);
        Ok(())
    }
}

impl Encode for RawFlow {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        check_finite("x", self.x)?;
        check_finite("y", self.y)?;

        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
        Ok(())
    }
}

impl Encode for Trim {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        for (field, value) in [
            ("roll", self.roll),
            ("pitch", self.pitch),
            ("yaw", self.yaw),
            ("throttle", self.throttle),
        ] {
            check_range(field, value, TRIM_MIN, TRIM_MAX)?;
        }

        buf.put_i16_le(self.roll);
        buf.put_i16_le(self.pitch);
        buf.put_i16_le(self.yaw);
        buf.put_i16_le(self.throttle);
        Ok(())
    }
}

impl Encode for Buzzer {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.put_u8(self.mode.to_byte());
        buf.put_u16_le(self.value);
        buf.put_u16_le(self.time);
        Ok(())
    }
}

impl Encode for RawMotion {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        for value in [
            self.accel_x,
            self.accel_y,
            self.accel_z,
            self.gyro_roll,
            self.gyro_pitch,
            self.gyro_yaw,
        ] {
            buf.put_i16_le(value);
        }
        Ok(())
    }
}

impl Encode for Button {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.put_u16_le(self.button);
        buf.put_u8(self.event.to_byte());
        Ok(())
    }
}

impl Encode for JoystickBlock {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        buf.put_i8(self.x);
        buf.put_i8(self.y);
        buf.put_u8(self.direction.to_byte());
        buf.put_u8(self.event.to_byte());
        Ok(())
    }
}

impl Encode for Joystick {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        self.left.encode_into(buf)?;
        self.right.encode_into(buf)
    }
}

impl Encode for CardColor {
    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        for sensor in self.hsvl.iter() {
            for value in sensor.iter() {
                buf.put_u16_le(*value);
            }
        }
        buf.put_u8(self.color[0].to_byte());
        buf.put_u8(self.color[1].to_byte());
        buf.put_u8(self.card);
        Ok(())
    }
}

/// Encode any payload into its wire bytes
///
/// # Errors
///
/// Returns [`EncodeError`] if a field is outside its declared range.
pub fn encode_payload(payload: &Payload) -> Result<Vec<u8>, EncodeError> {
    match payload {
        Payload::Ping(p) => p.encode(),
        Payload::Ack(p) => p.encode(),
        Payload::Error(p) => p.encode(),
        Payload::Request(p) => p.encode(),
        Payload::Information(p) => p.encode(),
        Payload::Control(p) => p.encode(),
        Payload::Command(p) => p.encode(),
        Payload::LightManual(p) => p.encode(),
        Payload::LightMode(p) | Payload::LightDefault(p) => p.encode(),
        Payload::State(p) => p.encode(),
        Payload::Attitude(p) => p.encode(),
        Payload::Position(p) => p.encode(),
        Payload::Altitude(p) => p.encode(),
        Payload::Motion(p) => p.encode(),
        Payload::Range(p) => p.encode(),
        Payload::Flow(p) => p.encode(),
        Payload::RawFlow(p) => p.encode(),
        Payload::Trim(p) => p.encode(),
        Payload::Buzzer(p) => p.encode(),
        Payload::RawMotion(p) => p.encode(),
        Payload::Button(p) => p.encode(),
        Payload::Joystick(p) => p.encode(),
        Payload::CardColor(p) => p.encode(),
    }
}

/// Encode a payload and wrap it into a complete host-to-drone frame
///
/// # Examples
///
/// ```
/// use codrone_link::protocol::encoder::encode_frame;
/// use codrone_link::protocol::payload::{Payload, Trim};
///
/// let trim = Trim { roll: 5, pitch: -3, yaw: 0, throttle: 0 };
/// let frame = encode_frame(&Payload::Trim(trim))?;
/// assert_eq!(frame.len(), 16);
/// # Ok::<(), codrone_link::error::EncodeError>(())
/// ```
pub fn encode_frame(payload: &Payload) -> Result<Vec<u8>, EncodeError> {
    let bytes = encode_payload(payload)?;
    build_frame(payload.data_type(), &bytes)
}
