//! This module contains [`CaenManager`], which executes every control operation on the
//! crates of a [`Config`].

use std::path::Path;

use log::{debug, error, info, warn};

use crate::{
    config::Config,
    error::{Error, Result},
    library::HvLibrary,
    parameter::{BoardParameter, ChannelParameter},
    report::{ChannelInfo, ParameterInfo, ParameterReading, StatusReport},
    status::{BoardStatus, ChannelStatus},
    types::{
        AccessMode, ChannelAddress, CrateMap, HvMode, Mode, ParamType, ParamValue, ParameterUnit,
        Property, PropertyValue, SystemHandle,
    },
};

/// Over-voltage applied in [`HvMode::Idle`], in volts.
pub const IDLE_OVERVOLTAGE: f64 = -10.0;

/// Drives the crates listed in a [`Config`] through any [`HvLibrary`].
///
/// Operations taking `daqs: Option<&[&str]>` act on every DAQ of the relevant
/// configuration section when given `None`, otherwise on the listed names.
pub struct CaenManager<L: HvLibrary> {
    library: L,
    config: Config,
    /// One handle per configured crate, in configuration order.
    handles: Vec<SystemHandle>,
    crate_maps: Vec<CrateMap>,
    closed: bool,
}

impl<L: HvLibrary> CaenManager<L> {
    /// Connect to every configured crate and read their crate maps.
    ///
    /// A crate that cannot be reached is an error. A crate map that cannot be read is
    /// only logged, the crate is then treated as having an unknown layout.
    pub fn new(mut library: L, config: Config) -> Result<Self> {
        let mut handles = Vec::with_capacity(config.crates.len());
        for (index, crate_config) in config.crates.iter().enumerate() {
            let result = library.init_system(
                crate_config.module,
                crate_config.linktype,
                &crate_config.address,
                &crate_config.username,
                &crate_config.password,
            );
            match result {
                Ok(handle) => {
                    info!(
                        "Connected to crate {} ({} over {} at {})",
                        index, crate_config.module, crate_config.linktype, crate_config.address
                    );
                    handles.push(handle);
                }
                Err(err) => {
                    error!("Could not connect to crate {}: {}", index, err);
                    for handle in handles {
                        if let Err(err) = library.deinit_system(handle) {
                            warn!("Failed to close {:?}: {}", handle, err);
                        }
                    }
                    return Err(err);
                }
            }
        }

        let crate_maps = handles
            .iter()
            .enumerate()
            .map(|(index, handle)| match library.crate_map(*handle) {
                Ok(map) => map,
                Err(err) => {
                    error!("Got error reading the map of crate {}: {}", index, err);
                    CrateMap::default()
                }
            })
            .collect();

        let manager = Self {
            library,
            config,
            handles,
            crate_maps,
            closed: false,
        };
        manager.check_mapping();
        Ok(manager)
    }

    /// Load the configuration file at `path` and connect.
    pub fn from_path(library: L, path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::from_path(path)?;
        Self::new(library, config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Crate maps read at start-up, indexed like the configured crates.
    pub fn crate_maps(&self) -> &[CrateMap] {
        &self.crate_maps
    }

    /// Resolve a DAQ name to its crate, board and channel.
    pub fn channel_address(&self, daq: &str, mode: Mode) -> Result<ChannelAddress> {
        self.config.channel_address(daq, mode)
    }

    /// Switch the LV power of the DAQ boards on or off.
    ///
    /// Unknown names are reported and skipped.
    pub fn switch_lv(&mut self, on: bool, daqs: Option<&[&str]>) -> Result<()> {
        for (daq, address) in self.switch_targets(Mode::Lv, daqs) {
            info!("Switching LV of {} {}", daq, if on { "on" } else { "off" });
            self.set(address, ChannelParameter::Pw, on.into())?;
        }
        Ok(())
    }

    /// Set the bias of the SiPMs so that they sit `ov` volts above breakdown.
    ///
    /// Every set-point is resolved before the first write.
    pub fn override_ov(&mut self, ov: f64, daqs: Option<&[&str]>) -> Result<()> {
        let targets = self.targets(Mode::Hv, daqs)?;
        for (daq, address, v) in self.bias_targets(targets, ov)? {
            self.set_bias(&daq, address, v, ov)?;
        }
        Ok(())
    }

    /// Change the HV power mode.
    ///
    /// Unknown names are reported and skipped.
    pub fn switch_hv(&mut self, mode: HvMode, daqs: Option<&[&str]>) -> Result<()> {
        let targets = self.switch_targets(Mode::Hv, daqs);
        let ov = match mode {
            HvMode::Off | HvMode::On => {
                for (daq, address) in targets {
                    info!("Switching HV of {} to {}", daq, mode);
                    self.set(address, ChannelParameter::Pw, (mode == HvMode::On).into())?;
                }
                return Ok(());
            }
            HvMode::Idle => IDLE_OVERVOLTAGE,
            HvMode::Operation => self.config.operation_ov()?,
        };
        for (daq, address, v) in self.bias_targets(targets, ov)? {
            info!("Switching HV of {} to {}", daq, mode);
            self.set_bias(&daq, address, v, ov)?;
            self.set(address, ChannelParameter::Pw, true.into())?;
        }
        Ok(())
    }

    /// Set the LV set-point, `None` uses `[board.default].v`.
    pub fn set_lv(&mut self, v: Option<f64>, daqs: Option<&[&str]>) -> Result<()> {
        let v = match v {
            Some(v) => v,
            None => self.config.default_lv()?,
        };
        for (daq, address) in self.targets(Mode::Lv, daqs)? {
            info!("Setting LV of {} to {}V", daq, v);
            self.set(address, ChannelParameter::V0Set, (v as f32).into())?;
        }
        Ok(())
    }

    /// Read every parameter of the selected channels.
    pub fn channel_info(&mut self, mode: Mode, daqs: Option<&[&str]>) -> Result<Vec<ChannelInfo>> {
        let mut infos = Vec::new();
        for (daq, address) in self.targets(mode, daqs)? {
            let handle = self.handle(address)?;
            let names =
                self.library
                    .channel_parameter_names(handle, address.board, address.channel)?;
            let mut parameters = Vec::with_capacity(names.len());
            for name in names {
                parameters.push(self.parameter_info(handle, address, name)?);
            }
            infos.push(ChannelInfo {
                daq,
                address,
                parameters,
            });
        }
        Ok(infos)
    }

    /// Read one parameter, with its unit, from the selected channels.
    pub fn channel_parameters(
        &mut self,
        name: &str,
        mode: Mode,
        daqs: Option<&[&str]>,
    ) -> Result<Vec<ParameterReading>> {
        let mut readings = Vec::new();
        for (daq, address) in self.targets(mode, daqs)? {
            let handle = self.handle(address)?;
            let value =
                self.library
                    .get_channel_parameter(handle, address.board, address.channel, name)?;
            let unit = match value {
                ParamValue::Numeric(_) => self.parameter_unit(handle, address, name),
                _ => None,
            };
            readings.push(ParameterReading {
                daq,
                address,
                name: name.to_string(),
                value,
                unit,
            });
        }
        Ok(readings)
    }

    pub fn get_channel_parameter(&mut self, name: &str, mode: Mode, daq: &str) -> Result<ParamValue> {
        let address = self.config.channel_address(daq, mode)?;
        let handle = self.handle(address)?;
        self.library
            .get_channel_parameter(handle, address.board, address.channel, name)
    }

    pub fn set_channel_parameter(
        &mut self,
        name: &str,
        mode: Mode,
        daq: &str,
        value: ParamValue,
    ) -> Result<()> {
        let address = self.config.channel_address(daq, mode)?;
        let handle = self.handle(address)?;
        info!("Setting {} of {} to {}", name, daq, value);
        self.library
            .set_channel_parameter(handle, address.board, address.channel, name, &value)
    }

    /// Decode the channel `Status` word of the selected channels.
    pub fn check_status(&mut self, mode: Mode, daqs: Option<&[&str]>) -> Result<Vec<StatusReport>> {
        let mut reports = Vec::new();
        for (daq, address) in self.targets(mode, daqs)? {
            let name: &str = ChannelParameter::Status.into();
            let handle = self.handle(address)?;
            let value =
                self.library
                    .get_channel_parameter(handle, address.board, address.channel, name)?;
            let word = status_word(&value, name)?;
            let alarms: Vec<_> = ChannelStatus::from_word(word)
                .faults()
                .into_iter()
                .map(|fault| fault.message())
                .collect();
            reports.push(report(daq, address, word, alarms));
        }
        Ok(reports)
    }

    /// Decode the `BdStatus` word of the board serving each selected channel.
    pub fn check_board_status(
        &mut self,
        mode: Mode,
        daqs: Option<&[&str]>,
    ) -> Result<Vec<StatusReport>> {
        let mut reports = Vec::new();
        for (daq, address) in self.targets(mode, daqs)? {
            let name: &str = BoardParameter::BdStatus.into();
            let handle = self.handle(address)?;
            let value = self.library.get_board_parameter(handle, address.board, name)?;
            let word = status_word(&value, name)?;
            let mut alarms: Vec<_> = BoardStatus::from_word(word)
                .alarms()
                .into_iter()
                .map(|alarm| alarm.message())
                .collect();
            // Power-fail and supply-fail share a message.
            alarms.dedup();
            reports.push(report(daq, address, word, alarms));
        }
        Ok(reports)
    }

    /// Disconnect from every crate. Called on drop if not done explicitly.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut result = Ok(());
        for (index, handle) in self.handles.iter().enumerate() {
            match self.library.deinit_system(*handle) {
                Ok(()) => debug!("Disconnected from crate {}", index),
                Err(err) => {
                    error!("Failed to disconnect from crate {}: {}", index, err);
                    if result.is_ok() {
                        result = Err(err);
                    }
                }
            }
        }
        result
    }

    fn handle(&self, address: ChannelAddress) -> Result<SystemHandle> {
        self.handles
            .get(address.crate_index)
            .copied()
            .ok_or(Error::UnknownCrate(address.crate_index))
    }

    fn set(
        &mut self,
        address: ChannelAddress,
        param: ChannelParameter,
        value: ParamValue,
    ) -> Result<()> {
        let handle = self.handle(address)?;
        debug!("{}: {} = {}", address, param, value);
        self.library.set_channel_parameter(
            handle,
            address.board,
            address.channel,
            param.as_ref(),
            &value,
        )
    }

    /// Attach the HV set-point giving over-voltage `ov` to every target.
    fn bias_targets(
        &self,
        targets: Vec<(String, ChannelAddress)>,
        ov: f64,
    ) -> Result<Vec<(String, ChannelAddress, f64)>> {
        targets
            .into_iter()
            .map(|(daq, address)| {
                let v = self.config.bias_voltage(&daq, ov)?;
                Ok((daq, address, v))
            })
            .collect()
    }

    fn set_bias(&mut self, daq: &str, address: ChannelAddress, v: f64, ov: f64) -> Result<()> {
        info!("Setting bias of {} to {}V (OV {}V)", daq, v, ov);
        self.set(address, ChannelParameter::V0Set, (v as f32).into())
    }

    /// Every DAQ of the section, or the listed ones. Unknown names are an error.
    fn targets(&self, mode: Mode, daqs: Option<&[&str]>) -> Result<Vec<(String, ChannelAddress)>> {
        let section = self.config.section(mode);
        match daqs {
            None => Ok(section
                .channels
                .iter()
                .map(|(daq, entry)| (daq.clone(), entry.address()))
                .collect()),
            Some(daqs) => daqs
                .iter()
                .map(|daq| Ok((daq.to_string(), self.config.channel_address(daq, mode)?)))
                .collect(),
        }
    }

    /// Like [`Self::targets`] but unknown names are only reported.
    fn switch_targets(&self, mode: Mode, daqs: Option<&[&str]>) -> Vec<(String, ChannelAddress)> {
        let Some(daqs) = daqs else {
            return self.targets(mode, None).unwrap_or_default();
        };
        daqs.iter()
            .filter_map(|daq| match self.config.channel_address(daq, mode) {
                Ok(address) => Some((daq.to_string(), address)),
                Err(_) => {
                    warn!("Module {} does not exist", daq);
                    None
                }
            })
            .collect()
    }

    fn parameter_info(
        &mut self,
        handle: SystemHandle,
        address: ChannelAddress,
        name: String,
    ) -> Result<ParameterInfo> {
        let (board, channel) = (address.board, address.channel);
        let kind = match self.library.get_channel_parameter_property(
            handle,
            board,
            channel,
            &name,
            Property::Type,
        )? {
            PropertyValue::Type(kind) => kind,
            _ => return Err(Error::UnsupportedType { name }),
        };
        let access = match self.library.get_channel_parameter_property(
            handle,
            board,
            channel,
            &name,
            Property::Mode,
        )? {
            PropertyValue::Mode(access) => access,
            _ => return Err(Error::UnsupportedType { name }),
        };
        let value = if access == AccessMode::WriteOnly || kind == ParamType::Command {
            None
        } else {
            Some(
                self.library
                    .get_channel_parameter(handle, board, channel, &name)?,
            )
        };
        let unit = if kind == ParamType::Numeric {
            self.parameter_unit(handle, address, &name)
        } else {
            None
        };
        Ok(ParameterInfo {
            name,
            kind,
            access,
            value,
            unit,
        })
    }

    fn parameter_unit(
        &mut self,
        handle: SystemHandle,
        address: ChannelAddress,
        name: &str,
    ) -> Option<ParameterUnit> {
        let (board, channel) = (address.board, address.channel);
        let unit = match self
            .library
            .get_channel_parameter_property(handle, board, channel, name, Property::Unit)
        {
            Ok(PropertyValue::Unit(unit)) => unit,
            Ok(_) => return None,
            Err(err) => {
                debug!("No unit for {}: {}", name, err);
                return None;
            }
        };
        let exponent = match self.library.get_channel_parameter_property(
            handle,
            board,
            channel,
            name,
            Property::Exponent,
        ) {
            Ok(PropertyValue::Exponent(exp)) => exp,
            _ => 0,
        };
        Some(ParameterUnit { unit, exponent })
    }

    /// Configured channels that a known crate map does not contain.
    ///
    /// Crates whose map could not be read are not checked.
    pub fn unmapped_channels(&self) -> Vec<(Mode, String, ChannelAddress)> {
        let mut unmapped = Vec::new();
        for mode in [Mode::Lv, Mode::Hv] {
            for (daq, entry) in &self.config.section(mode).channels {
                let Some(map) = self.crate_maps.get(entry.crate_index) else {
                    continue;
                };
                if !map.slots.is_empty() && !map.contains(entry.board, entry.channel) {
                    unmapped.push((mode, daq.clone(), entry.address()));
                }
            }
        }
        unmapped
    }

    fn check_mapping(&self) {
        for (mode, daq, address) in self.unmapped_channels() {
            warn!(
                "{} {} maps to {} which the crate does not report",
                mode, daq, address
            );
        }
    }
}

impl<L: HvLibrary> Drop for CaenManager<L> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("Error while disconnecting: {}", err);
        }
    }
}

fn status_word(value: &ParamValue, name: &str) -> Result<u32> {
    value.as_word().ok_or_else(|| Error::UnsupportedType {
        name: name.to_string(),
    })
}

fn report(daq: String, address: ChannelAddress, word: u32, alarms: Vec<&'static str>) -> StatusReport {
    for alarm in &alarms {
        warn!("The board {} {}", daq, alarm);
    }
    StatusReport {
        daq,
        address,
        word,
        alarms,
    }
}
