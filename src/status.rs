//! Channel and board status words.
//!
//! Both words are plain bit sets reported by the board firmware through the
//! `Status` channel parameter and the `BdStatus` board parameter.

use modular_bitfield::prelude::*;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Layout of the `Status` channel parameter.
#[bitfield(bytes = 2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    pub on: bool,
    pub ramp_up: bool,
    pub ramp_down: bool,
    pub over_current: bool,
    pub over_voltage: bool,
    pub under_voltage: bool,
    pub external_trip: bool,
    /// Output reached the hardware voltage limit.
    pub max_voltage: bool,
    pub external_disable: bool,
    pub internal_trip: bool,
    pub calibration_error: bool,
    pub unplugged: bool,
    #[skip]
    __: B1,
    pub over_voltage_protection: bool,
    pub power_fail: bool,
    pub temperature_error: bool,
}

impl ChannelStatus {
    /// Decode the low 16 bits of a raw status word.
    pub fn from_word(word: u32) -> Self {
        Self::from_bytes([word as u8, (word >> 8) as u8])
    }

    /// All fault conditions currently flagged.
    pub fn faults(&self) -> Vec<ChannelFault> {
        ChannelFault::iter().filter(|f| f.is_set(self)).collect()
    }

    pub fn is_ok(&self) -> bool {
        self.faults().is_empty()
    }
}

/// Channel status bits which indicate a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ChannelFault {
    OverCurrent,
    OverVoltage,
    UnderVoltage,
    ExternalTrip,
    MaxVoltage,
    ExternalDisable,
    InternalTrip,
    CalibrationError,
    Unplugged,
    OverVoltageProtection,
    PowerFail,
    TemperatureError,
}

impl ChannelFault {
    fn is_set(self, status: &ChannelStatus) -> bool {
        use ChannelFault as CF;
        match self {
            CF::OverCurrent => status.over_current(),
            CF::OverVoltage => status.over_voltage(),
            CF::UnderVoltage => status.under_voltage(),
            CF::ExternalTrip => status.external_trip(),
            CF::MaxVoltage => status.max_voltage(),
            CF::ExternalDisable => status.external_disable(),
            CF::InternalTrip => status.internal_trip(),
            CF::CalibrationError => status.calibration_error(),
            CF::Unplugged => status.unplugged(),
            CF::OverVoltageProtection => status.over_voltage_protection(),
            CF::PowerFail => status.power_fail(),
            CF::TemperatureError => status.temperature_error(),
        }
    }

    /// Message completing "The board {daq} ...".
    pub fn message(self) -> &'static str {
        use ChannelFault as CF;
        match self {
            CF::OverCurrent => "is in over-current status",
            CF::OverVoltage => "is in over-voltage status",
            CF::UnderVoltage => "is in under-voltage status",
            CF::ExternalTrip => "has been tripped externally",
            CF::MaxVoltage => "has reached the maximum voltage",
            CF::ExternalDisable => "is disabled externally",
            CF::InternalTrip => "has been tripped internally",
            CF::CalibrationError => "has a calibration error",
            CF::Unplugged => "is unplugged",
            CF::OverVoltageProtection => "is in over-voltage protection",
            CF::PowerFail => "is in power-fail status",
            CF::TemperatureError => "has a temperature error",
        }
    }
}

/// Layout of the `BdStatus` board parameter.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardStatus {
    pub power_fail: bool,
    /// Also reported as power-fail.
    pub supply_fail: bool,
    pub hv_calibration_error: bool,
    pub temperature_calibration_error: bool,
    pub under_temperature: bool,
    pub over_temperature: bool,
    #[skip]
    __: B2,
}

impl BoardStatus {
    pub fn from_word(word: u32) -> Self {
        Self::from_bytes([word as u8])
    }

    /// All alarms currently flagged, lowest bit first.
    pub fn alarms(&self) -> Vec<BoardAlarm> {
        BoardAlarm::iter().filter(|a| a.is_set(self)).collect()
    }
}

/// Board alarm table, one entry per `BdStatus` bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum BoardAlarm {
    PowerFail,
    SupplyFail,
    HvCalibrationError,
    TemperatureCalibrationError,
    UnderTemperature,
    OverTemperature,
}

impl BoardAlarm {
    fn is_set(self, status: &BoardStatus) -> bool {
        match self {
            BoardAlarm::PowerFail => status.power_fail(),
            BoardAlarm::SupplyFail => status.supply_fail(),
            BoardAlarm::HvCalibrationError => status.hv_calibration_error(),
            BoardAlarm::TemperatureCalibrationError => status.temperature_calibration_error(),
            BoardAlarm::UnderTemperature => status.under_temperature(),
            BoardAlarm::OverTemperature => status.over_temperature(),
        }
    }

    /// Message completing "The board {daq} ...".
    pub fn message(self) -> &'static str {
        match self {
            BoardAlarm::PowerFail | BoardAlarm::SupplyFail => "is in power-fail status",
            BoardAlarm::HvCalibrationError => "has a calibration error on HV",
            BoardAlarm::TemperatureCalibrationError => "has a calibration error on temperature",
            BoardAlarm::UnderTemperature => "is in under-temperature status",
            BoardAlarm::OverTemperature => "is in over-temperature status",
        }
    }
}
