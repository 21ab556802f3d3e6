//! Configuration file describing the crates and the DAQ channel map.

use std::{collections::BTreeMap, path::Path, str::FromStr};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    types::{ChannelAddress, LinkType, Mode, SystemType},
};

/// Name of the entry holding the section-wide defaults.
pub const DEFAULT_ENTRY: &str = "default";

/// Connection settings of one power-supply crate.
#[derive(Debug, Clone, Deserialize)]
pub struct CrateConfig {
    /// CAEN system type, e.g. `SY5527`.
    pub module: SystemType,
    pub linktype: LinkType,
    /// IP address for TCP/IP, device identifier for the other links.
    pub address: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Section-wide default values, the `[board.default]` or `[bias.default]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
    /// LV set-point in volts.
    pub v: Option<f64>,
    /// HV operating over-voltage in volts.
    pub ov: Option<f64>,
    /// TOFPET input offset voltage in volts.
    pub v_offset_tofpet: Option<f64>,
}

/// One DAQ entry of a section.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEntry {
    #[serde(rename = "crate")]
    pub crate_index: usize,
    pub board: u16,
    pub channel: u16,
    /// SiPM breakdown voltage in volts. HV only.
    pub v_bd: Option<f64>,
    /// Overrides the section default. HV only.
    pub v_offset_tofpet: Option<f64>,
}

impl ChannelEntry {
    pub fn address(&self) -> ChannelAddress {
        ChannelAddress {
            crate_index: self.crate_index,
            board: self.board,
            channel: self.channel,
        }
    }
}

/// The `[board]` (LV) or `[bias]` (HV) channel map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub default: Defaults,
    #[serde(flatten)]
    pub channels: BTreeMap<String, ChannelEntry>,
}

impl Section {
    /// All configured DAQ names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn channel(&self, daq: &str) -> Option<&ChannelEntry> {
        self.channels.get(daq)
    }

    pub fn contains(&self, daq: &str) -> bool {
        self.channels.contains_key(daq)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crates: Vec<CrateConfig>,
    /// LV channel map.
    #[serde(default)]
    pub board: Section,
    /// HV channel map.
    #[serde(default)]
    pub bias: Section,
}

impl Config {
    /// Read and validate a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    pub fn section(&self, mode: Mode) -> &Section {
        match mode {
            Mode::Lv => &self.board,
            Mode::Hv => &self.bias,
        }
    }

    pub fn channel(&self, daq: &str, mode: Mode) -> Result<&ChannelEntry> {
        self.section(mode)
            .channel(daq)
            .ok_or_else(|| Error::UnknownDaq {
                daq: daq.to_string(),
                mode,
            })
    }

    /// Resolve a DAQ name to its crate, board and channel.
    pub fn channel_address(&self, daq: &str, mode: Mode) -> Result<ChannelAddress> {
        Ok(self.channel(daq, mode)?.address())
    }

    /// HV set-point giving over-voltage `ov` on `daq`: `ov + v_offset_tofpet + v_bd`.
    pub fn bias_voltage(&self, daq: &str, ov: f64) -> Result<f64> {
        let entry = self.channel(daq, Mode::Hv)?;
        let v_bd = entry.v_bd.ok_or_else(|| missing(&format!("bias.{daq}"), "v_bd"))?;
        let offset = entry
            .v_offset_tofpet
            .or(self.bias.default.v_offset_tofpet)
            .ok_or_else(|| missing("bias.default", "v_offset_tofpet"))?;
        Ok(ov + offset + v_bd)
    }

    /// Operating over-voltage from `[bias.default]`.
    pub fn operation_ov(&self) -> Result<f64> {
        self.bias.default.ov.ok_or_else(|| missing("bias.default", "ov"))
    }

    /// LV set-point from `[board.default]`.
    pub fn default_lv(&self) -> Result<f64> {
        self.board.default.v.ok_or_else(|| missing("board.default", "v"))
    }

    fn validate(&self) -> Result<()> {
        for section in [&self.board, &self.bias] {
            if let Some(entry) = section
                .channels
                .values()
                .find(|e| e.crate_index >= self.crates.len())
            {
                return Err(Error::UnknownCrate(entry.crate_index));
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

fn missing(section: &str, key: &'static str) -> Error {
    Error::MissingValue {
        section: section.to_string(),
        key,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"
        [[crates]]
        module = "SY5527"
        linktype = "TCPIP"
        address = "10.0.0.1"
        username = "admin"
        password = "admin"

        [[crates]]
        module = "SY4527"
        linktype = "TCPIP"
        address = "10.0.0.2"

        [board.default]
        v = 12.5

        [board.m1x1]
        crate = 0
        board = 3
        channel = 0

        [board.m1x2]
        crate = 0
        board = 3
        channel = 1

        [bias.default]
        ov = 3.5
        v_offset_tofpet = 0.75

        [bias.m1x1]
        crate = 1
        board = 0
        channel = 4
        v_bd = 52.0

        [bias.m1x2]
        crate = 1
        board = 0
        channel = 5
        v_bd = 51.5
        v_offset_tofpet = 1.0
    "#;

    #[test]
    fn parse_sample() {
        let config: Config = SAMPLE.parse().unwrap();
        assert_eq!(config.crates.len(), 2);
        assert_eq!(config.crates[0].module, SystemType::Sy5527);
        assert_eq!(config.crates[1].linktype, LinkType::TcpIp);
        assert_eq!(config.crates[1].username, "");

        let names: Vec<_> = config.board.names().collect();
        assert_eq!(names, vec!["m1x1", "m1x2"]);
        assert!(!config.bias.contains(DEFAULT_ENTRY));
    }

    #[test]
    fn example_config_parses() {
        let config: Config = include_str!("../config/snd_caen.toml").parse().unwrap();
        assert_eq!(config.crates.len(), 2);
        assert_eq!(config.bias_voltage("m1x2", 3.5).unwrap(), 3.5 + 0.8 + 52.4);
    }

    #[test]
    fn resolve_addresses() {
        let config: Config = SAMPLE.parse().unwrap();
        let address = config.channel_address("m1x2", Mode::Lv).unwrap();
        assert_eq!(
            address,
            ChannelAddress {
                crate_index: 0,
                board: 3,
                channel: 1
            }
        );
        assert_eq!(
            config.channel_address("m1x1", Mode::Hv).unwrap().to_string(),
            "crate = 1, board = 0, channel = 4"
        );

        let err = config.channel_address("m9x9", Mode::Hv).unwrap_err();
        assert!(matches!(err, Error::UnknownDaq { ref daq, mode: Mode::Hv } if daq == "m9x9"));
        assert_eq!(err.to_string(), "Module m9x9 does not exist in the [bias] section");
    }

    #[test]
    fn bias_voltage_uses_offsets() {
        let config: Config = SAMPLE.parse().unwrap();
        // Falls back to the default offset.
        assert_eq!(config.bias_voltage("m1x1", 3.5).unwrap(), 3.5 + 0.75 + 52.0);
        // Per-channel offset wins.
        assert_eq!(config.bias_voltage("m1x2", -10.0).unwrap(), -10.0 + 1.0 + 51.5);
        assert_eq!(config.operation_ov().unwrap(), 3.5);
        assert_eq!(config.default_lv().unwrap(), 12.5);
    }

    #[test]
    fn missing_values() {
        let text = r#"
            [[crates]]
            module = "N1470"
            linktype = "USB"
            address = "0"

            [bias.m2x1]
            crate = 0
            board = 0
            channel = 0
        "#;
        let config: Config = text.parse().unwrap();
        let err = config.bias_voltage("m2x1", 3.0).unwrap_err();
        assert!(matches!(err, Error::MissingValue { key: "v_bd", .. }));
        assert!(matches!(
            config.operation_ov().unwrap_err(),
            Error::MissingValue { key: "ov", .. }
        ));
        assert!(matches!(
            config.default_lv().unwrap_err(),
            Error::MissingValue { key: "v", .. }
        ));
    }

    #[test]
    fn rejects_unknown_crate_index() {
        let text = r#"
            [[crates]]
            module = "SY5527"
            linktype = "TCPIP"
            address = "10.0.0.1"

            [board.m1x1]
            crate = 2
            board = 0
            channel = 0
        "#;
        let err = text.parse::<Config>().unwrap_err();
        assert!(matches!(err, Error::UnknownCrate(2)));
    }

    #[test]
    fn rejects_unknown_system_type() {
        let text = r#"
            [[crates]]
            module = "SY9999"
            linktype = "TCPIP"
            address = "10.0.0.1"
        "#;
        assert!(matches!(
            text.parse::<Config>().unwrap_err(),
            Error::ConfigParse(_)
        ));
    }
}
