//! # Protocol Constants and Types
//!
//! Core protocol definitions for the CoDrone EDU serial link: framing
//! constants, the data-type tag, and the wire enums carried inside payloads.
//!
//! Every wire enum carries an explicit `Unknown(u8)` variant. Firmware
//! revisions add values over time, so an unrecognized ordinal is preserved
//! rather than rejected, and re-encodes to the same byte.

/// First start marker byte
pub const START_BYTE_1: u8 = 0x0A;

/// Second start marker byte
pub const START_BYTE_2: u8 = 0x55;

/// Start marker sequence that opens every frame
pub const START_MARKER: [u8; 2] = [START_BYTE_1, START_BYTE_2];

/// Header size: data_type(1) + length(1) + from(1) + to(1)
pub const HEADER_SIZE: usize = 4;

/// Trailing CRC16 size
pub const CHECKSUM_SIZE: usize = 2;

/// Largest payload the host accepts in a single frame
pub const MAX_PAYLOAD_SIZE: usize = 128;

/// Smallest possible frame: start(2) + header(4) + crc(2)
pub const MIN_FRAME_SIZE: usize = START_MARKER.len() + HEADER_SIZE + CHECKSUM_SIZE;

/// Trim value range (per axis)
pub const TRIM_MIN: i16 = -100;
pub const TRIM_MAX: i16 = 100;

/// Control stick range (per axis, percent)
pub const CONTROL_MIN: i8 = -100;
pub const CONTROL_MAX: i8 = 100;

/// Attitude / angle range in degrees
pub const ANGLE_MIN: i16 = -180;
pub const ANGLE_MAX: i16 = 180;

/// Battery level range in percent
pub const BATTERY_MAX: u8 = 100;

/// Declares a byte-sized wire enum with an `Unknown(u8)` fallback.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Ordinal not known to this host
            Unknown(u8),
        }

        impl $name {
            /// Map a wire ordinal to its variant
            pub fn from_byte(value: u8) -> Self {
                match value {
                    $( $value => Self::$variant, )+
                    other => Self::Unknown(other),
                }
            }

            /// Wire ordinal of this variant
            pub fn to_byte(self) -> u8 {
                match self {
                    $( Self::$variant => $value, )+
                    Self::Unknown(other) => other,
                }
            }
        }

        impl From<u8> for $name {
            fn from(value: u8) -> Self {
                Self::from_byte(value)
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.to_byte()
            }
        }
    };
}

wire_enum! {
    /// Data-type tag selecting a frame's payload layout
    pub enum DataType {
        Ping = 0x01,
        Ack = 0x02,
        Error = 0x03,
        Request = 0x04,
        Message = 0x05,
        Address = 0x06,
        Information = 0x07,
        UpdateLocation = 0x09,
        SystemInformation = 0x0C,
        Registration = 0x0D,
        Control = 0x10,
        Command = 0x11,
        Pairing = 0x12,
        Rssi = 0x13,
        LightManual = 0x20,
        LightMode = 0x21,
        LightEvent = 0x22,
        LightDefault = 0x23,
        RawMotion = 0x30,
        RawFlow = 0x31,
        State = 0x40,
        Attitude = 0x41,
        Position = 0x42,
        Altitude = 0x43,
        Motion = 0x44,
        Range = 0x45,
        Flow = 0x46,
        Count = 0x50,
        Bias = 0x51,
        Trim = 0x52,
        Weight = 0x53,
        Buzzer = 0x62,
        Button = 0x70,
        Joystick = 0x71,
        DisplayClear = 0x80,
        DisplayInvert = 0x81,
        DisplayDrawPoint = 0x82,
        DisplayDrawLine = 0x83,
        DisplayDrawRect = 0x84,
        DisplayDrawCircle = 0x85,
        DisplayDrawString = 0x86,
        CardClassify = 0x90,
        CardRange = 0x91,
        CardRaw = 0x92,
        CardColor = 0x93,
        CardList = 0x94,
        CardFunctionList = 0x95,
    }
}

wire_enum! {
    /// Endpoint addresses carried in the header's from/to fields
    pub enum DeviceType {
        None = 0x00,
        Drone = 0x10,
        Controller = 0x20,
        Link = 0x30,
        LinkServer = 0x31,
        BleClient = 0x32,
        BleServer = 0x33,
        Range = 0x40,
        Base = 0x70,
        ByScratch = 0x80,
        Scratch = 0x81,
        Entry = 0x82,
        Tester = 0xA0,
        Monitor = 0xA1,
        Updater = 0xA2,
        Encrypter = 0xA3,
        Whispering = 0xFE,
        Broadcasting = 0xFF,
    }
}

wire_enum! {
    /// Command carried in a `Command` payload
    pub enum CommandType {
        None = 0x00,
        Stop = 0x01,
        ModeControlFlight = 0x02,
        Headless = 0x03,
        ControlSpeed = 0x04,
        ClearBias = 0x05,
        ClearTrim = 0x06,
        FlightEvent = 0x07,
        SetDefault = 0x08,
        Backlight = 0x09,
        ModeController = 0x0A,
        Link = 0x0B,
        ClearCounter = 0xA0,
        NavigationTargetClear = 0xE0,
        NavigationStart = 0xE1,
        NavigationPause = 0xE2,
        NavigationRestart = 0xE3,
        NavigationStop = 0xE4,
        NavigationNext = 0xE5,
        NavigationReturnToHome = 0xE6,
    }
}

wire_enum! {
    /// Option byte for `CommandType::FlightEvent`
    pub enum FlightEvent {
        None = 0x00,
        Stop = 0x10,
        TakeOff = 0x11,
        Landing = 0x12,
        Reverse = 0x13,
        FlipFront = 0x14,
        FlipRear = 0x15,
        FlipLeft = 0x16,
        FlipRight = 0x17,
        Return = 0x18,
        Shot = 0x90,
        UnderAttack = 0x91,
        ResetHeading = 0xA0,
    }
}

wire_enum! {
    pub enum ModeSystem {
        None = 0x00,
        Boot = 0x10,
        Start = 0x11,
        Running = 0x12,
        ReadyToReset = 0x13,
        Error = 0xA0,
    }
}

wire_enum! {
    pub enum ModeFlight {
        None = 0x00,
        Ready = 0x10,
        Start = 0x11,
        TakeOff = 0x12,
        Flight = 0x13,
        Landing = 0x14,
        Flip = 0x15,
        Reverse = 0x16,
        Stop = 0x20,
        Accident = 0x30,
        Error = 0x31,
        Test = 0x40,
    }
}

wire_enum! {
    pub enum ModeControlFlight {
        None = 0x00,
        Attitude = 0x10,
        Position = 0x11,
        Manual = 0x12,
        Rate = 0x13,
        Function = 0x14,
    }
}

wire_enum! {
    pub enum ModeMovement {
        None = 0x00,
        Ready = 0x01,
        Hovering = 0x02,
        Moving = 0x03,
        ReturnHome = 0x04,
    }
}

wire_enum! {
    pub enum Headless {
        None = 0x00,
        Headless = 0x01,
        Normal = 0x02,
    }
}

wire_enum! {
    pub enum SensorOrientation {
        None = 0x00,
        Normal = 0x01,
        ReverseStart = 0x02,
        Reversed = 0x03,
    }
}

wire_enum! {
    /// Firmware update state reported in `Information`
    pub enum ModeUpdate {
        None = 0x00,
        Ready = 0x01,
        Updating = 0x02,
        Complete = 0x03,
        Failed = 0x04,
        NotAvailable = 0x05,
        RunApplication = 0x06,
        NotRegistered = 0x07,
    }
}

wire_enum! {
    pub enum BuzzerMode {
        Stop = 0x00,
        Mute = 0x01,
        MuteReserve = 0x02,
        Scale = 0x03,
        ScaleReserve = 0x04,
        Hz = 0x05,
        HzReserve = 0x06,
    }
}

wire_enum! {
    /// Drone LED modes used by `LightMode` and `LightDefault`
    pub enum LightModeDrone {
        None = 0x00,
        RearNone = 0x10,
        RearManual = 0x11,
        RearHold = 0x12,
        RearFlicker = 0x13,
        RearFlickerDouble = 0x14,
        RearDimming = 0x15,
        RearSunrise = 0x16,
        RearSunset = 0x17,
        BodyNone = 0x20,
        BodyManual = 0x21,
        BodyHold = 0x22,
        BodyFlicker = 0x23,
        BodyFlickerDouble = 0x24,
        BodyDimming = 0x25,
        BodySunrise = 0x26,
        BodySunset = 0x27,
        BodyRainbow = 0x28,
        BodyRainbow2 = 0x29,
    }
}

wire_enum! {
    /// Controller button transition
    pub enum ButtonEvent {
        None = 0x00,
        Down = 0x01,
        Press = 0x02,
        Up = 0x03,
        EndContinuePress = 0x04,
    }
}

wire_enum! {
    /// Stick zone on the controller's 3x3 grid
    pub enum JoystickDirection {
        None = 0x00,
        Top = 0x10,
        Middle = 0x20,
        Bottom = 0x40,
        Left = 0x01,
        Center = 0x02,
        Right = 0x04,
        TopLeft = 0x11,
        TopCenter = 0x12,
        TopRight = 0x14,
        MiddleLeft = 0x21,
        MiddleCenter = 0x22,
        MiddleRight = 0x24,
        BottomLeft = 0x41,
        BottomCenter = 0x42,
        BottomRight = 0x44,
    }
}

wire_enum! {
    /// Stick zone transition
    pub enum JoystickEvent {
        None = 0x00,
        In = 0x01,
        Stay = 0x02,
        Out = 0x03,
    }
}

wire_enum! {
    /// Color classified by the downward card reader
    pub enum CardColorIndex {
        Undetected = 0x00,
        White = 0x01,
        Red = 0x02,
        Yellow = 0x03,
        Green = 0x04,
        Cyan = 0x05,
        Blue = 0x06,
        Magenta = 0x07,
        Black = 0x08,
    }
}

/// Sensor error bits reported in the `Error` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SensorErrorFlags(pub u32);

impl SensorErrorFlags {
    pub const MOTION_NO_ANSWER: u32 = 0x0000_0001;
    pub const MOTION_WRONG_VALUE: u32 = 0x0000_0002;
    pub const MOTION_NOT_CALIBRATED: u32 = 0x0000_0004;
    pub const MOTION_CALIBRATING: u32 = 0x0000_0008;
    pub const PRESSURE_NO_ANSWER: u32 = 0x0000_0010;
    pub const PRESSURE_WRONG_VALUE: u32 = 0x0000_0020;
    pub const RANGE_GROUND_NO_ANSWER: u32 = 0x0000_0100;
    pub const RANGE_GROUND_WRONG_VALUE: u32 = 0x0000_0200;
    pub const FLOW_NO_ANSWER: u32 = 0x0000_1000;
    pub const FLOW_WRONG_VALUE: u32 = 0x0000_2000;
    pub const FLOW_CANNOT_RECOGNIZE_GROUND_IMAGE: u32 = 0x0000_4000;

    /// True if every bit of `flag` is set
    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }
}

/// Flight-state error bits reported in the `Error` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateErrorFlags(pub u32);

impl StateErrorFlags {
    pub const NOT_REGISTERED: u32 = 0x0000_0001;
    pub const FLASH_READ_LOCK_UNLOCKED: u32 = 0x0000_0002;
    pub const BOOTLOADER_WRITE_LOCK_UNLOCKED: u32 = 0x0000_0004;
    pub const LOW_BATTERY: u32 = 0x0000_0008;
    pub const TAKEOFF_FAILURE_CHECK_PROPELLER_AND_MOTOR: u32 = 0x0000_0010;
    pub const CHECK_PROPELLER_VIBRATION: u32 = 0x0000_0020;
    pub const ATTITUDE_NOT_STABLE: u32 = 0x0000_0040;
    pub const CANNOT_FLIP_LOW_BATTERY: u32 = 0x0000_0100;
    pub const CANNOT_FLIP_TOO_HEAVY: u32 = 0x0000_0200;

    /// True if every bit of `flag` is set
    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    /// Errors that make flight unsafe
    pub fn has_critical(self) -> bool {
        self.0
            & (Self::LOW_BATTERY
                | Self::ATTITUDE_NOT_STABLE
                | Self::TAKEOFF_FAILURE_CHECK_PROPELLER_AND_MOTOR
                | Self::CHECK_PROPELLER_VIBRATION)
            != 0
    }
}

/// Health of one sensor, derived from `SensorErrorFlags`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorHealth {
    Ok,
    NoAnswer,
    WrongValue,
    NotCalibrated,
    Calibrating,
    CannotRecognizeGroundImage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(START_MARKER, [0x0A, 0x55]);
        assert_eq!(HEADER_SIZE, 4);
        assert_eq!(CHECKSUM_SIZE, 2);
        assert_eq!(MIN_FRAME_SIZE, 8);
    }

    #[test]
    fn test_data_type_known_values() {
        assert_eq!(DataType::from_byte(0x52), DataType::Trim);
        assert_eq!(DataType::from_byte(0x41), DataType::Attitude);
        assert_eq!(DataType::Error.to_byte(), 0x03);
        assert_eq!(u8::from(DataType::Ack), 0x02);
    }

    #[test]
    fn test_unknown_ordinal_is_preserved() {
        let tag = DataType::from_byte(0xEE);
        assert_eq!(tag, DataType::Unknown(0xEE));
        assert_eq!(tag.to_byte(), 0xEE);

        let mode = ModeFlight::from(0x77);
        assert_eq!(mode, ModeFlight::Unknown(0x77));
    }

    #[test]
    fn test_flight_event_values() {
        assert_eq!(FlightEvent::TakeOff.to_byte(), 0x11);
        assert_eq!(FlightEvent::Landing.to_byte(), 0x12);
        assert_eq!(FlightEvent::Stop.to_byte(), 0x10);
    }

    #[test]
    fn test_controller_and_card_enums() {
        assert_eq!(JoystickDirection::from_byte(0x44), JoystickDirection::BottomRight);
        assert_eq!(ButtonEvent::Press.to_byte(), 0x02);
        assert_eq!(CardColorIndex::from_byte(0x00), CardColorIndex::Undetected);
        assert_eq!(CardColorIndex::from_byte(0x09), CardColorIndex::Unknown(0x09));
    }

    #[test]
    fn test_sensor_flags_contains() {
        let flags = SensorErrorFlags(
            SensorErrorFlags::MOTION_CALIBRATING | SensorErrorFlags::FLOW_NO_ANSWER,
        );
        assert!(flags.contains(SensorErrorFlags::MOTION_CALIBRATING));
        assert!(flags.contains(SensorErrorFlags::FLOW_NO_ANSWER));
        assert!(!flags.contains(SensorErrorFlags::PRESSURE_NO_ANSWER));
    }

    #[test]
    fn test_state_flags_critical() {
        assert!(StateErrorFlags(StateErrorFlags::LOW_BATTERY).has_critical());
        assert!(!StateErrorFlags(StateErrorFlags::NOT_REGISTERED).has_critical());
        assert!(!StateErrorFlags::default().has_critical());
    }
}
