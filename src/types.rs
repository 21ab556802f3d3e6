//! This module contains the types exchanged with the CAEN HV wrapper library.

use core::fmt;

use serde::Deserialize;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// All CAEN system types the wrapper library can drive.
///
/// The discriminant is the `CAENHV_SYSTEM_TYPE_t` value passed to `CAENHV_InitSystem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Deserialize)]
#[serde(try_from = "String")]
#[repr(i32)]
pub enum SystemType {
    #[strum(serialize = "SY1527")]
    Sy1527 = 0,
    #[strum(serialize = "SY2527")]
    Sy2527 = 1,
    #[strum(serialize = "SY4527")]
    Sy4527 = 2,
    #[strum(serialize = "SY5527")]
    Sy5527 = 3,
    #[strum(serialize = "N568")]
    N568 = 4,
    #[strum(serialize = "V65XX")]
    V65xx = 5,
    #[strum(serialize = "N1470")]
    N1470 = 6,
    #[strum(serialize = "V8100")]
    V8100 = 7,
    #[strum(serialize = "N568E")]
    N568e = 8,
    #[strum(serialize = "DT55XX")]
    Dt55xx = 9,
    #[strum(serialize = "FTK")]
    Ftk = 10,
    #[strum(serialize = "DT55XXE")]
    Dt55xxe = 11,
    #[strum(serialize = "N1068")]
    N1068 = 12,
    #[strum(serialize = "SMARTHV")]
    SmartHv = 13,
    #[strum(serialize = "NGPS")]
    Ngps = 14,
    #[strum(serialize = "N1168")]
    N1168 = 15,
    #[strum(serialize = "R6060")]
    R6060 = 16,
}

impl TryFrom<String> for SystemType {
    type Error = strum::ParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Physical link used to reach a crate controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Deserialize)]
#[serde(try_from = "String")]
#[repr(i32)]
pub enum LinkType {
    #[strum(serialize = "TCPIP")]
    TcpIp = 0,
    #[strum(serialize = "RS232")]
    Rs232 = 1,
    #[strum(serialize = "CAENET")]
    Caenet = 2,
    #[strum(serialize = "USB")]
    Usb = 3,
    #[strum(serialize = "OPTLINK")]
    OptLink = 4,
    #[strum(serialize = "USB_VCP")]
    UsbVcp = 5,
    #[strum(serialize = "USB3")]
    Usb3 = 6,
    #[strum(serialize = "A4818")]
    A4818 = 7,
}

impl TryFrom<String> for LinkType {
    type Error = strum::ParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Which half of the detector powering a DAQ name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, clap::ValueEnum)]
pub enum Mode {
    /// Low voltage of the DAQ boards, the `[board]` configuration section.
    #[strum(serialize = "lv")]
    Lv,
    /// SiPM bias high voltage, the `[bias]` configuration section.
    #[strum(serialize = "hv")]
    Hv,
}

impl Mode {
    /// Name of the configuration section holding this mode's channel map.
    pub fn section_name(self) -> &'static str {
        match self {
            Mode::Lv => "board",
            Mode::Hv => "bias",
        }
    }
}

/// High voltage power modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, clap::ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum HvMode {
    /// Power off.
    Off,
    /// Power on at an over-voltage of -10V.
    Idle,
    /// Power on at the default operating over-voltage.
    Operation,
    /// Power on with the previously set voltage.
    On,
}

/// Handle returned by `CAENHV_InitSystem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemHandle(pub i32);

/// Physical location of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAddress {
    /// Position of the crate in the `[[crates]]` list.
    pub crate_index: usize,
    /// Slot of the board inside the crate.
    pub board: u16,
    pub channel: u16,
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "crate = {}, board = {}, channel = {}",
            self.crate_index, self.board, self.channel
        )
    }
}

/// Value of the `Type` property of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[repr(u32)]
pub enum ParamType {
    Numeric = 0,
    OnOff = 1,
    ChannelStatus = 2,
    BoardStatus = 3,
    Binary = 4,
    String = 5,
    Enum = 6,
    Command = 7,
}

impl TryFrom<u32> for ParamType {
    type Error = u32;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        use ParamType as PT;
        match value {
            0 => Ok(PT::Numeric),
            1 => Ok(PT::OnOff),
            2 => Ok(PT::ChannelStatus),
            3 => Ok(PT::BoardStatus),
            4 => Ok(PT::Binary),
            5 => Ok(PT::String),
            6 => Ok(PT::Enum),
            7 => Ok(PT::Command),
            other => Err(other),
        }
    }
}

/// Value of the `Mode` property of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[repr(u32)]
pub enum AccessMode {
    #[strum(serialize = "R")]
    ReadOnly = 0,
    #[strum(serialize = "W")]
    WriteOnly = 1,
    #[strum(serialize = "R/W")]
    ReadWrite = 2,
}

impl TryFrom<u32> for AccessMode {
    type Error = u32;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            t if t == AccessMode::ReadOnly as u32 => Ok(AccessMode::ReadOnly),
            t if t == AccessMode::WriteOnly as u32 => Ok(AccessMode::WriteOnly),
            t if t == AccessMode::ReadWrite as u32 => Ok(AccessMode::ReadWrite),
            other => Err(other),
        }
    }
}

/// Value of the `Unit` property of a numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
#[repr(u16)]
pub enum Unit {
    None = 0,
    Ampere = 1,
    Volt = 2,
    Watt = 3,
    Celsius = 4,
    Hertz = 5,
    Bar = 6,
    VoltPerSecond = 7,
    Second = 8,
    Rpm = 9,
    Count = 10,
    Bit = 11,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Ampere => "A",
            Unit::Volt => "V",
            Unit::Watt => "W",
            Unit::Celsius => "C",
            Unit::Hertz => "Hz",
            Unit::Bar => "bar",
            Unit::VoltPerSecond => "V/s",
            Unit::Second => "s",
            Unit::Rpm => "rpm",
            Unit::Count => "counts",
            Unit::Bit => "bit",
        }
    }
}

impl TryFrom<u16> for Unit {
    type Error = u16;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use strum::IntoEnumIterator;
        Unit::iter().find(|u| *u as u16 == value).ok_or(value)
    }
}

/// A unit together with its decimal exponent, as reported by the `Unit` and `Exp` properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterUnit {
    pub unit: Unit,
    pub exponent: i8,
}

impl fmt::Display for ParameterUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.exponent {
            -12 => "p",
            -9 => "n",
            -6 => "u",
            -3 => "m",
            0 => "",
            3 => "k",
            6 => "M",
            exp => return write!(f, "e{} {}", exp, self.unit.symbol()),
        };
        write!(f, "{}{}", prefix, self.unit.symbol())
    }
}

/// Channel parameter properties understood by `CAENHV_GetChParamProp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, EnumIter)]
pub enum Property {
    Type,
    Mode,
    #[strum(serialize = "Minval")]
    MinValue,
    #[strum(serialize = "Maxval")]
    MaxValue,
    Unit,
    #[strum(serialize = "Exp")]
    Exponent,
    #[strum(serialize = "Onstate")]
    OnState,
    #[strum(serialize = "Offstate")]
    OffState,
}

/// Value of a parameter property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Type(ParamType),
    Mode(AccessMode),
    Numeric(f32),
    Unit(Unit),
    Exponent(i8),
    Text(String),
}

/// Value of a channel or board parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Numeric(f32),
    OnOff(bool),
    /// Raw channel or board status word.
    Status(u32),
    Binary(u32),
    Enum(u32),
    Text(String),
}

impl ParamValue {
    /// Return the raw word of any integer-typed value.
    pub fn as_word(&self) -> Option<u32> {
        match *self {
            ParamValue::Status(v) | ParamValue::Binary(v) | ParamValue::Enum(v) => Some(v),
            ParamValue::OnOff(v) => Some(v as u32),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::OnOff(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Numeric(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Numeric(v) => write!(f, "{}", v),
            ParamValue::OnOff(true) => write!(f, "On"),
            ParamValue::OnOff(false) => write!(f, "Off"),
            ParamValue::Status(v) | ParamValue::Binary(v) => write!(f, "{:#06x}", v),
            ParamValue::Enum(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// One slot of a crate as reported by `CAENHV_GetCrateMap`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlotInfo {
    /// Empty for an unoccupied slot.
    pub model: String,
    pub description: String,
    pub channels: u16,
    pub serial_number: u16,
    /// Firmware release as (major, minor).
    pub firmware: (u8, u8),
}

impl SlotInfo {
    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
    }
}

/// All slots of one crate, indexed by slot number.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrateMap {
    pub slots: Vec<SlotInfo>,
}

impl CrateMap {
    /// Return the board in `slot`, or `None` for an empty or non-existent slot.
    pub fn slot(&self, slot: u16) -> Option<&SlotInfo> {
        self.slots.get(slot as usize).filter(|s| !s.is_empty())
    }

    /// Whether the crate has a board in `slot` with at least `channel + 1` channels.
    pub fn contains(&self, slot: u16, channel: u16) -> bool {
        self.slot(slot).is_some_and(|s| channel < s.channels)
    }
}

impl fmt::Display for CrateMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (slot, info) in self.slots.iter().enumerate().filter(|(_, s)| !s.is_empty()) {
            writeln!(
                f,
                "slot {:2}: {} ({}) {} channels, serial {}, firmware {}.{:02}",
                slot,
                info.model,
                info.description,
                info.channels,
                info.serial_number,
                info.firmware.0,
                info.firmware.1
            )?;
        }
        Ok(())
    }
}
