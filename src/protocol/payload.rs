//! # Payload Records
//!
//! Typed records for every payload layout the host models, and the
//! [`Payload`] sum type that the codec, receiver, status store and request
//! bridge pass around.
//!
//! Byte layouts live next to the codec in [`super::encoder`] and
//! [`super::decoder`]; this module only declares the shapes.

use super::types::*;

/// Fixed wire size of a payload record
pub trait Layout {
    /// Exact payload length in bytes
    const SIZE: usize;
}

/// Keep-alive and round-trip timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub system_time: u64,
}

/// Acknowledgement of a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub system_time: u64,
    /// Data type of the frame being acknowledged
    pub data_type: DataType,
    pub crc16: u16,
}

/// Sensor and flight-state error report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorStatus {
    pub system_time: u64,
    pub sensor: SensorErrorFlags,
    pub state: StateErrorFlags,
}

impl ErrorStatus {
    /// Gyro/accelerometer health
    pub fn motion_health(&self) -> SensorHealth {
        if self.sensor.contains(SensorErrorFlags::MOTION_NO_ANSWER) {
            SensorHealth::NoAnswer
        } else if self.sensor.contains(SensorErrorFlags::MOTION_WRONG_VALUE) {
            SensorHealth::WrongValue
        } else if self.sensor.contains(SensorErrorFlags::MOTION_CALIBRATING) {
            SensorHealth::Calibrating
        } else if self.sensor.contains(SensorErrorFlags::MOTION_NOT_CALIBRATED) {
            SensorHealth::NotCalibrated
        } else {
            SensorHealth::Ok
        }
    }

    /// Barometer health
    pub fn pressure_health(&self) -> SensorHealth {
        if self.sensor.contains(SensorErrorFlags::PRESSURE_NO_ANSWER) {
            SensorHealth::NoAnswer
        } else if self.sensor.contains(SensorErrorFlags::PRESSURE_WRONG_VALUE) {
            SensorHealth::WrongValue
        } else {
            SensorHealth::Ok
        }
    }

    /// Downward range sensor health
    pub fn range_health(&self) -> SensorHealth {
        if self.sensor.contains(SensorErrorFlags::RANGE_GROUND_NO_ANSWER) {
            SensorHealth::NoAnswer
        } else if self.sensor.contains(SensorErrorFlags::RANGE_GROUND_WRONG_VALUE) {
            SensorHealth::WrongValue
        } else {
            SensorHealth::Ok
        }
    }

    /// Optical flow sensor health
    pub fn flow_health(&self) -> SensorHealth {
        if self.sensor.contains(SensorErrorFlags::FLOW_NO_ANSWER) {
            SensorHealth::NoAnswer
        } else if self.sensor.contains(SensorErrorFlags::FLOW_WRONG_VALUE) {
            SensorHealth::WrongValue
        } else if self
            .sensor
            .contains(SensorErrorFlags::FLOW_CANNOT_RECOGNIZE_GROUND_IMAGE)
        {
            SensorHealth::CannotRecognizeGroundImage
        } else {
            SensorHealth::Ok
        }
    }

    /// Gyro bias calibration still running
    pub fn is_calibrating(&self) -> bool {
        self.sensor.contains(SensorErrorFlags::MOTION_CALIBRATING)
    }

    pub fn is_low_battery(&self) -> bool {
        self.state.contains(StateErrorFlags::LOW_BATTERY)
    }

    pub fn has_errors(&self) -> bool {
        self.sensor.0 != 0 || self.state.0 != 0
    }
}

/// Ask the drone to send one frame of `data_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub data_type: DataType,
}

/// Firmware version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub build: u16,
    pub minor: u8,
    pub major: u8,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Device identification and firmware build date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Information {
    pub mode_update: ModeUpdate,
    pub model_number: u32,
    pub version: Version,
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// Stick input, each axis in percent (-100..=100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Control {
    pub roll: i8,
    pub pitch: i8,
    pub yaw: i8,
    pub throttle: i8,
}

/// Generic command with a one-byte option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub command_type: CommandType,
    pub option: u8,
}

impl Command {
    pub fn new(command_type: CommandType, option: u8) -> Self {
        Self {
            command_type,
            option,
        }
    }

    /// Flight event command (takeoff, landing, stop, flips)
    pub fn flight_event(event: FlightEvent) -> Self {
        Self::new(CommandType::FlightEvent, event.to_byte())
    }
}

/// Direct LED control by flag mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightManual {
    pub flags: u16,
    pub brightness: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// LED mode with color, used by both `LightMode` and `LightDefault`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightMode {
    pub mode: LightModeDrone,
    pub interval: u16,
    pub color: Color,
}

/// Flight controller state and battery level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub mode_system: ModeSystem,
    pub mode_flight: ModeFlight,
    pub mode_control_flight: ModeControlFlight,
    pub mode_movement: ModeMovement,
    pub headless: Headless,
    pub control_speed: u8,
    pub sensor_orientation: SensorOrientation,
    /// Battery level in percent
    pub battery: u8,
}

impl State {
    pub fn is_ready(&self) -> bool {
        self.mode_flight == ModeFlight::Ready
    }

    pub fn is_flying(&self) -> bool {
        matches!(
            self.mode_flight,
            ModeFlight::TakeOff | ModeFlight::Flight | ModeFlight::Flip | ModeFlight::Reverse
        )
    }

    pub fn is_landing(&self) -> bool {
        self.mode_flight == ModeFlight::Landing
    }
}

/// Orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attitude {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
}

/// Estimated position in meters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Barometer readings and range-derived height
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Altitude {
    pub temperature: f32,
    pub pressure: f32,
    pub altitude: f32,
    pub range_height: f32,
}

/// IMU readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Motion {
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    pub gyro_roll: i16,
    pub gyro_pitch: i16,
    pub gyro_yaw: i16,
    pub angle_roll: i16,
    pub angle_pitch: i16,
    pub angle_yaw: i16,
}

/// Uncalibrated IMU readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawMotion {
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    pub gyro_roll: i16,
    pub gyro_pitch: i16,
    pub gyro_yaw: i16,
}

/// Range sensor distances in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub left: i16,
    pub front: i16,
    pub right: i16,
    pub rear: i16,
    pub top: i16,
    pub bottom: i16,
}

/// Optical flow displacement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Flow {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawFlow {
    pub x: f32,
    pub y: f32,
}

/// Flight trim, each axis -100..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trim {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
    pub throttle: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buzzer {
    pub mode: BuzzerMode,
    /// Scale index or frequency in Hz depending on `mode`
    pub value: u16,
    /// Duration in milliseconds
    pub time: u16,
}

/// Controller button state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    /// Bit mask of the buttons involved in `event`
    pub button: u16,
    pub event: ButtonEvent,
}

/// One controller stick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickBlock {
    pub x: i8,
    pub y: i8,
    pub direction: JoystickDirection,
    pub event: JoystickEvent,
}

/// Both controller sticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Joystick {
    pub left: JoystickBlock,
    pub right: JoystickBlock,
}

/// Card reader output for the front and rear color sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardColor {
    /// Hue, saturation, value and lightness per sensor, front first
    pub hsvl: [[u16; 4]; 2],
    /// Classified color per sensor, front first
    pub color: [CardColorIndex; 2],
    /// Card identifier derived from both colors
    pub card: u8,
}

impl CardColor {
    pub fn front(&self) -> CardColorIndex {
        self.color[0]
    }

    pub fn rear(&self) -> CardColorIndex {
        self.color[1]
    }
}

impl Layout for Ping {
    const SIZE: usize = 8;
}
impl Layout for Ack {
    const SIZE: usize = 11;
}
impl Layout for ErrorStatus {
    const SIZE: usize = 16;
}
impl Layout for Request {
    const SIZE: usize = 1;
}
impl Layout for Information {
    const SIZE: usize = 13;
}
impl Layout for Control {
    const SIZE: usize = 4;
}
impl Layout for Command {
    const SIZE: usize = 2;
}
impl Layout for LightManual {
    const SIZE: usize = 3;
}
impl Layout for LightMode {
    const SIZE: usize = 6;
}
impl Layout for State {
    const SIZE: usize = 8;
}
impl Layout for Attitude {
    const SIZE: usize = 6;
}
impl Layout for Position {
    const SIZE: usize = 12;
}
impl Layout for Altitude {
    const SIZE: usize = 16;
}
impl Layout for Motion {
    const SIZE: usize = 18;
}
impl Layout for Range {
    const SIZE: usize = 12;
}
impl Layout for Flow {
    const SIZE: usize = 12;
}
impl Layout for RawFlow {
    const SIZE: usize = 8;
}
impl Layout for Trim {
    const SIZE: usize = 8;
}
impl Layout for Buzzer {
    const SIZE: usize = 5;
}
impl Layout for RawMotion {
    const SIZE: usize = 12;
}
impl Layout for Button {
    const SIZE: usize = 3;
}
impl Layout for JoystickBlock {
    const SIZE: usize = 4;
}
impl Layout for Joystick {
    const SIZE: usize = 2 * JoystickBlock::SIZE;
}
impl Layout for CardColor {
    const SIZE: usize = 19;
}

/// A decoded or to-be-encoded payload, tagged by its data type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    Ping(Ping),
    Ack(Ack),
    Error(ErrorStatus),
    Request(Request),
    Information(Information),
    Control(Control),
    Command(Command),
    LightManual(LightManual),
    LightMode(LightMode),
    LightDefault(LightMode),
    State(State),
    Attitude(Attitude),
    Position(Position),
    Altitude(Altitude),
    Motion(Motion),
    Range(Range),
    Flow(Flow),
    RawFlow(RawFlow),
    Trim(Trim),
    Buzzer(Buzzer),
    RawMotion(RawMotion),
    Button(Button),
    Joystick(Joystick),
    CardColor(CardColor),
}

impl Payload {
    /// Tag this payload travels under
    pub fn data_type(&self) -> DataType {
        match self {
            Payload::Ping(_) => DataType::Ping,
            Payload::Ack(_) => DataType::Ack,
            Payload::Error(_) => DataType::Error,
            Payload::Request(_) => DataType::Request,
            Payload::Information(_) => DataType::Information,
            Payload::Control(_) => DataType::Control,
            Payload::Command(_) => DataType::Command,
            Payload::LightManual(_) => DataType::LightManual,
            Payload::LightMode(_) => DataType::LightMode,
            Payload::LightDefault(_) => DataType::LightDefault,
            Payload::State(_) => DataType::State,
            Payload::Attitude(_) => DataType::Attitude,
            Payload::Position(_) => DataType::Position,
            Payload::Altitude(_) => DataType::Altitude,
            Payload::Motion(_) => DataType::Motion,
            Payload::Range(_) => DataType::Range,
            Payload::Flow(_) => DataType::Flow,
            Payload::RawFlow(_) => DataType::RawFlow,
            Payload::Trim(_) => DataType::Trim,
            Payload::Buzzer(_) => DataType::Buzzer,
            Payload::RawMotion(_) => DataType::RawMotion,
            Payload::Button(_) => DataType::Button,
            Payload::Joystick(_) => DataType::Joystick,
            Payload::CardColor(_) => DataType::CardColor,
        }
    }

    /// Wire size of this payload
    pub fn size(&self) -> usize {
        match self {
            Payload::Ping(_) => Ping::SIZE,
            Payload::Ack(_) => Ack::SIZE,
            Payload::Error(_) => ErrorStatus::SIZE,
            Payload::Request(_) => Request::SIZE,
            Payload::Information(_) => Information::SIZE,
            Payload::Control(_) => Control::SIZE,
            Payload::Command(_) => Command::SIZE,
            Payload::LightManual(_) => LightManual::SIZE,
            Payload::LightMode(_) | Payload::LightDefault(_) => LightMode::SIZE,
            Payload::State(_) => State::SIZE,
            Payload::Attitude(_) => Attitude::SIZE,
            Payload::Position(_) => Position::SIZE,
            Payload::Altitude(_) => Altitude::SIZE,
            Payload::Motion(_) => Motion::SIZE,
            Payload::Range(_) => Range::SIZE,
            Payload::Flow(_) => Flow::SIZE,
            Payload::RawFlow(_) => RawFlow::SIZE,
            Payload::Trim(_) => Trim::SIZE,
            Payload::Buzzer(_) => Buzzer::SIZE,
            Payload::RawMotion(_) => RawMotion::SIZE,
            Payload::Button(_) => Button::SIZE,
            Payload::Joystick(_) => Joystick::SIZE,
            Payload::CardColor(_) => CardColor::SIZE,
        }
    }
}
