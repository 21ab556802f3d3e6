//! This module is used to name the CAEN channel and board parameters.
//!
//! Parameter names are defined by the board firmware. Only the ones the manager
//! touches directly are listed here; any other name can still be read through
//! the `&str` based calls.

use strum_macros::{AsRefStr, Display, EnumIter, IntoStaticStr};

#[derive(Debug, Copy, Clone, PartialEq, Eq, AsRefStr, Display, IntoStaticStr, EnumIter)]
pub enum ChannelParameter {
    /// __R/W__ - Output power switch.
    ///
    /// On/off value.
    Pw,
    /// __R/W__ - Voltage set-point in volts.
    V0Set,
    /// __R/W__ - Current limit, usually in micro-amps for HV boards.
    I0Set,
    /// __R__ - Monitored output voltage.
    VMon,
    /// __R__ - Monitored output current.
    IMon,
    /// __R/W__ - Ramp-up rate in V/s.
    RUp,
    /// __R/W__ - Ramp-down rate in V/s.
    RDWn,
    /// __R/W__ - Trip time in seconds.
    Trip,
    /// __R/W__ - Software voltage limit.
    SVMax,
    /// __R__ - Channel status word.
    ///
    /// See [`ChannelStatus`](crate::status::ChannelStatus) for the bit layout.
    Status,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, AsRefStr, Display, IntoStaticStr)]
pub enum BoardParameter {
    /// __R__ - Board status word.
    ///
    /// See [`BoardStatus`](crate::status::BoardStatus) for the bit layout.
    BdStatus,
    /// __R__ - Board temperature.
    Temp,
    /// __R__ - High voltage limit set by the trimmer.
    HVMax,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn parameter_names_match_firmware() {
        assert_eq!(ChannelParameter::V0Set.as_ref(), "V0Set");
        assert_eq!(ChannelParameter::RDWn.as_ref(), "RDWn");
        assert_eq!(BoardParameter::BdStatus.as_ref(), "BdStatus");

        // Firmware parameter names are limited to ten characters.
        for param in ChannelParameter::iter() {
            let name: &'static str = param.into();
            assert!(name.len() < 10);
        }
    }
}
