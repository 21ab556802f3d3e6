//! Records returned by the read operations of the manager.
//!
//! Each one prints the way operators are used to reading it on the console.

use core::fmt;

use crate::types::{AccessMode, ChannelAddress, ParamType, ParamValue, ParameterUnit};

/// One parameter of a channel with its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub kind: ParamType,
    pub access: AccessMode,
    /// `None` for write-only parameters.
    pub value: Option<ParamValue>,
    pub unit: Option<ParameterUnit>,
}

impl fmt::Display for ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10} ", self.name)?;
        match &self.value {
            Some(value) => write!(f, "{}", value)?,
            None => write!(f, "-")?,
        }
        if let Some(unit) = self.unit {
            write!(f, " {}", unit)?;
        }
        write!(f, " ({}, {})", self.kind, self.access)
    }
}

/// Every parameter of one DAQ channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub daq: String,
    pub address: ChannelAddress,
    pub parameters: Vec<ParameterInfo>,
}

impl fmt::Display for ChannelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DAQ {} channel information:", self.daq)?;
        writeln!(f, "{}", self.address)?;
        for param in &self.parameters {
            writeln!(f, "  {}", param)?;
        }
        write!(f, "^")
    }
}

/// A single parameter read from one DAQ channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterReading {
    pub daq: String,
    pub address: ChannelAddress,
    pub name: String,
    pub value: ParamValue,
    pub unit: Option<ParameterUnit>,
}

impl fmt::Display for ParameterReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DAQ {} parameter {} information : {}",
            self.daq, self.name, self.value
        )?;
        if let Some(unit) = self.unit {
            write!(f, " {}", unit)?;
        }
        Ok(())
    }
}

/// Decoded channel or board status of one DAQ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub daq: String,
    pub address: ChannelAddress,
    /// Raw status word.
    pub word: u32,
    /// Messages completing "The board {daq} ...", empty when nothing is flagged.
    pub alarms: Vec<&'static str>,
}

impl StatusReport {
    pub fn is_ok(&self) -> bool {
        self.alarms.is_empty()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "The board {} is working correctly.", self.daq);
        }
        for (i, alarm) in self.alarms.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "The board {} {}", self.daq, alarm)?;
        }
        Ok(())
    }
}
