//! BTHome v2 object registry.
//!
//! Every supported object id maps to a [`FieldKind`], and every kind has a
//! static [`FieldSpec`] describing how its payload is read and scaled. Object
//! ids missing from the registry are unknown; since the stream carries no
//! per-field length, an unknown id ends decoding.
//!
//! See: https://bthome.io/format/

use std::fmt;

/// Number of payload bytes of an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Width {
    /// Number of bytes occupied on the wire.
    #[inline]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self as u32 * 8
    }
}

/// Integer encoding of a field payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntType {
    U8,
    I8,
    U16,
    I16,
    U24,
    I24,
}

impl IntType {
    pub const fn width(self) -> Width {
        match self {
            IntType::U8 | IntType::I8 => Width::One,
            IntType::U16 | IntType::I16 => Width::Two,
            IntType::U24 | IntType::I24 => Width::Three,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, IntType::I8 | IntType::I16 | IntType::I24)
    }
}

/// Static description of one BTHome object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Object id on the wire
    pub tag: u8,
    /// Name used as the key in decoded records
    pub name: &'static str,
    /// Payload encoding
    pub int_type: IntType,
    /// Factor applied to the raw integer
    pub scale: f64,
    /// Unit of the scaled value, if any
    pub unit: Option<&'static str>,
}

impl FieldSpec {
    /// Apply the scale factor to a raw integer.
    ///
    /// Fields without a scale stay integers so that counters, flags and the
    /// packet id are not turned into floats.
    pub fn apply(&self, raw: i32) -> Value {
        if self.scale == 1.0 {
            Value::Integer(raw)
        } else {
            Value::Float(f64::from(raw) * self.scale)
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Integer(i32),
    Float(f64),
}

impl Value {
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Integer(v) => f64::from(v),
            Value::Float(v) => v,
        }
    }

    /// Integer value, if the field was not scaled.
    pub fn as_integer(self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(v),
            Value::Float(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! field_kinds {
    (@scale) => { 1.0 };
    (@scale $scale:literal) => { $scale };
    (@unit) => { None };
    (@unit $unit:literal) => { Some($unit) };
    ($(
        $(#[$meta:meta])*
        $kind:ident = $tag:literal => $name:literal, $int:ident
            $(, scale = $scale:literal)? $(, unit = $unit:literal)?;
    )*) => {
        /// Supported BTHome object kinds.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum FieldKind {
            $( $(#[$meta])* $kind, )*
        }

        impl FieldKind {
            /// Every supported kind, in object id order.
            pub const ALL: &'static [FieldKind] = &[$( FieldKind::$kind, )*];

            /// Look up the kind for an object id.
            pub const fn from_tag(tag: u8) -> Option<Self> {
                match tag {
                    $( $tag => Some(FieldKind::$kind), )*
                    _ => None,
                }
            }

            pub const fn spec(self) -> FieldSpec {
                match self {
                    $( FieldKind::$kind => FieldSpec {
                        tag: $tag,
                        name: $name,
                        int_type: IntType::$int,
                        scale: field_kinds!(@scale $($scale)?),
                        unit: field_kinds!(@unit $($unit)?),
                    }, )*
                }
            }
        }
    };
}

field_kinds! {
    /// Packet id, incremented by the beacon for every new reading
    PacketId = 0x00 => "pid", U8;
    Battery = 0x01 => "battery", U8, unit = "%";
    Temperature = 0x02 => "temperature", I16, scale = 0.01, unit = "°C";
    Humidity = 0x03 => "humidity", U16, scale = 0.01, unit = "%";
    Pressure = 0x04 => "pressure", U24, scale = 0.01, unit = "hPa";
    Illuminance = 0x05 => "illuminance", U24, scale = 0.01, unit = "lx";
    Mass = 0x06 => "mass", U16, scale = 0.01, unit = "kg";
    MassLb = 0x07 => "mass_lb", U16, scale = 0.01, unit = "lb";
    Dewpoint = 0x08 => "dewpoint", I16, scale = 0.01, unit = "°C";
    Count = 0x09 => "count", U8;
    Energy = 0x0A => "energy", U24, scale = 0.001, unit = "kWh";
    Power = 0x0B => "power", U24, scale = 0.01, unit = "W";
    Voltage = 0x0C => "voltage", U16, scale = 0.001, unit = "V";
    Pm25 = 0x0D => "pm2_5", U16, unit = "µg/m³";
    Pm10 = 0x0E => "pm10", U16, unit = "µg/m³";
    GenericBoolean = 0x0F => "generic_boolean", U8;
    PowerOn = 0x10 => "power_on", U8;
    Opening = 0x11 => "opening", U8;
    Co2 = 0x12 => "co2", U16, unit = "ppm";
    Tvoc = 0x13 => "tvoc", U16, unit = "µg/m³";
    Moisture = 0x14 => "moisture", U16, scale = 0.01, unit = "%";
    BatteryLow = 0x15 => "battery_low", U8;
    BatteryCharging = 0x16 => "battery_charging", U8;
    CarbonMonoxide = 0x17 => "carbon_monoxide", U8;
    Cold = 0x18 => "cold", U8;
    Connectivity = 0x19 => "connectivity", U8;
    Door = 0x1A => "door", U8;
    GarageDoor = 0x1B => "garage_door", U8;
    GasDetected = 0x1C => "gas_detected", U8;
    Heat = 0x1D => "heat", U8;
    Light = 0x1E => "light", U8;
    Lock = 0x1F => "lock", U8;
    MoistureDetected = 0x20 => "moisture_detected", U8;
    /// Motion detected (1) or cleared (0)
    Motion = 0x21 => "motion", U8;
    Moving = 0x22 => "moving", U8;
    Occupancy = 0x23 => "occupancy", U8;
    Plug = 0x24 => "plug", U8;
    Presence = 0x25 => "presence", U8;
    Problem = 0x26 => "problem", U8;
    Running = 0x27 => "running", U8;
    Safety = 0x28 => "safety", U8;
    Smoke = 0x29 => "smoke", U8;
    Sound = 0x2A => "sound", U8;
    Tamper = 0x2B => "tamper", U8;
    Vibration = 0x2C => "vibration", U8;
    Window = 0x2D => "window", U8;
    HumidityCoarse = 0x2E => "humidity", U8, unit = "%";
    MoistureCoarse = 0x2F => "moisture", U8, unit = "%";
    /// Button event code (press, double press, long press, ...)
    Button = 0x3A => "button", U8;
    /// Dimmer event code in the low byte, steps in the high byte
    Dimmer = 0x3C => "dimmer", U16;
    Count16 = 0x3D => "count", U16;
    Rotation = 0x3F => "rotation", I16, scale = 0.1, unit = "°";
    DistanceMm = 0x40 => "distance_mm", U16, unit = "mm";
    DistanceM = 0x41 => "distance_m", U16, scale = 0.1, unit = "m";
    Duration = 0x42 => "duration", U24, scale = 0.001, unit = "s";
    Current = 0x43 => "current", U16, scale = 0.001, unit = "A";
    Speed = 0x44 => "speed", U16, scale = 0.01, unit = "m/s";
    TemperatureCoarse = 0x45 => "temperature", I16, scale = 0.1, unit = "°C";
    UvIndex = 0x46 => "uv_index", U8, scale = 0.1;
    Volume = 0x47 => "volume", U16, scale = 0.1, unit = "L";
    VolumeMl = 0x48 => "volume_ml", U16, unit = "mL";
    VolumeFlowRate = 0x49 => "volume_flow_rate", U16, scale = 0.001, unit = "m³/h";
    VoltageCoarse = 0x4A => "voltage", U16, scale = 0.1, unit = "V";
    Gas = 0x4B => "gas", U24, scale = 0.001, unit = "m³";
    Acceleration = 0x51 => "acceleration", U16, scale = 0.001, unit = "m/s²";
    Gyroscope = 0x52 => "gyroscope", U16, scale = 0.001, unit = "°/s";
    Conductivity = 0x56 => "conductivity", U16, unit = "µS/cm";
    Temperature8 = 0x57 => "temperature", I8, unit = "°C";
    TemperatureCoarse8 = 0x58 => "temperature", I8, scale = 0.35, unit = "°C";
    CountSigned8 = 0x59 => "count", I8;
    CountSigned16 = 0x5A => "count", I16;
    CurrentSigned = 0x5D => "current", I16, scale = 0.001, unit = "A";
    Direction = 0x5E => "direction", U16, scale = 0.01, unit = "°";
    Precipitation = 0x5F => "precipitation", U16, scale = 0.1, unit = "mm";
    Channel = 0x60 => "channel", U8;
    RotationalSpeed = 0x61 => "rotational_speed", U16, unit = "rpm";
    DeviceTypeId = 0xF0 => "device_type_id", U16;
    /// Firmware version as patch, minor, major bytes
    FirmwareVersion = 0xF2 => "firmware_version", U24;
}

impl FieldKind {
    #[inline]
    pub const fn tag(self) -> u8 {
        self.spec().tag
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        self.spec().name
    }
}

/// Look up the spec for an object id.
pub fn lookup(tag: u8) -> Option<FieldSpec> {
    FieldKind::from_tag(tag).map(FieldKind::spec)
}
