//! We use this mocking module in unit tests to emulate the CAEN HV wrapper library.

use std::collections::HashMap;

use crate::{
    error::{Error, Result},
    library::HvLibrary,
    types::{
        AccessMode, CrateMap, LinkType, ParamType, ParamValue, Property, PropertyValue,
        SystemHandle, SystemType, Unit,
    },
};

/// Return code used for every simulated failure.
pub const MOCK_ERROR_CODE: i32 = 0x0F;

/// A parameter write seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub address: String,
    pub board: u16,
    pub channel: u16,
    pub name: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone)]
struct MockParam {
    value: ParamValue,
    kind: ParamType,
    access: AccessMode,
    unit: Option<(Unit, i8)>,
}

type ChannelKey = (String, u16, u16, String);

/// Our mock type used to emulate a set of crates, keyed by their configured address.
#[derive(Default)]
pub struct MockLibrary {
    /// Address of every initialised system, handle `n` is at index `n - 1`.
    systems: Vec<String>,
    deinitialised: Vec<SystemHandle>,
    crate_maps: HashMap<String, CrateMap>,
    channel_params: HashMap<ChannelKey, MockParam>,
    board_params: HashMap<(String, u16, String), ParamValue>,
    writes: Vec<Write>,
    /// Addresses for which init fails.
    unreachable: Vec<String>,
}

impl MockLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a read/write channel parameter. Its type is taken from the value.
    pub fn add_channel_parameter(
        &mut self,
        address: &str,
        board: u16,
        channel: u16,
        name: &str,
        value: ParamValue,
    ) {
        let kind = match value {
            ParamValue::Numeric(_) => ParamType::Numeric,
            ParamValue::OnOff(_) => ParamType::OnOff,
            ParamValue::Status(_) => ParamType::ChannelStatus,
            ParamValue::Binary(_) => ParamType::Binary,
            ParamValue::Enum(_) => ParamType::Enum,
            ParamValue::Text(_) => ParamType::String,
        };
        let access = if kind == ParamType::ChannelStatus {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };
        self.channel_params.insert(
            (address.to_string(), board, channel, name.to_string()),
            MockParam {
                value,
                kind,
                access,
                unit: None,
            },
        );
    }

    /// Attach a unit to an existing numeric parameter.
    pub fn set_unit(
        &mut self,
        address: &str,
        board: u16,
        channel: u16,
        name: &str,
        unit: Unit,
        exponent: i8,
    ) {
        if let Some(param) = self.channel_params.get_mut(&(
            address.to_string(),
            board,
            channel,
            name.to_string(),
        )) {
            param.unit = Some((unit, exponent));
        }
    }

    pub fn add_board_parameter(&mut self, address: &str, board: u16, name: &str, value: ParamValue) {
        self.board_params
            .insert((address.to_string(), board, name.to_string()), value);
    }

    pub fn set_crate_map(&mut self, address: &str, map: CrateMap) {
        self.crate_maps.insert(address.to_string(), map);
    }

    /// Make `init_system` fail for this address.
    pub fn set_unreachable(&mut self, address: &str) {
        self.unreachable.push(address.to_string());
    }

    /// Every parameter write, in order.
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    pub fn deinitialised(&self) -> &[SystemHandle] {
        &self.deinitialised
    }

    pub fn handle_of(&self, address: &str) -> Option<SystemHandle> {
        self.systems
            .iter()
            .position(|a| a == address)
            .map(|i| SystemHandle(i as i32 + 1))
    }

    /// Current value of a channel parameter.
    pub fn channel_value(
        &self,
        address: &str,
        board: u16,
        channel: u16,
        name: &str,
    ) -> Option<&ParamValue> {
        self.channel_params
            .get(&(address.to_string(), board, channel, name.to_string()))
            .map(|p| &p.value)
    }

    fn address(&self, handle: SystemHandle, call: &'static str) -> Result<String> {
        let open = !self.deinitialised.contains(&handle);
        usize::try_from(handle.0 - 1)
            .ok()
            .and_then(|i| self.systems.get(i))
            .filter(|_| open)
            .cloned()
            .ok_or_else(|| failure(call, "Not connected"))
    }

    fn param(
        &self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
        call: &'static str,
    ) -> Result<&MockParam> {
        let address = self.address(handle, call)?;
        self.channel_params
            .get(&(address, board, channel, name.to_string()))
            .ok_or_else(|| failure(call, "Parameter not found"))
    }
}

fn failure(call: &'static str, message: &str) -> Error {
    Error::Library {
        call,
        code: MOCK_ERROR_CODE,
        message: message.to_string(),
    }
}

impl HvLibrary for MockLibrary {
    fn init_system(
        &mut self,
        _system: SystemType,
        _link: LinkType,
        address: &str,
        _username: &str,
        _password: &str,
    ) -> Result<SystemHandle> {
        if self.unreachable.iter().any(|a| a == address) {
            return Err(failure("CAENHV_InitSystem", "Communication error"));
        }
        self.systems.push(address.to_string());
        Ok(SystemHandle(self.systems.len() as i32))
    }

    fn deinit_system(&mut self, handle: SystemHandle) -> Result<()> {
        self.address(handle, "CAENHV_DeinitSystem")?;
        self.deinitialised.push(handle);
        Ok(())
    }

    fn crate_map(&mut self, handle: SystemHandle) -> Result<CrateMap> {
        let address = self.address(handle, "CAENHV_GetCrateMap")?;
        self.crate_maps
            .get(&address)
            .cloned()
            .ok_or_else(|| failure("CAENHV_GetCrateMap", "Crate map unavailable"))
    }

    fn get_channel_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
    ) -> Result<ParamValue> {
        let param = self.param(handle, board, channel, name, "CAENHV_GetChParam")?;
        Ok(param.value.clone())
    }

    fn set_channel_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
        value: &ParamValue,
    ) -> Result<()> {
        let address = self.address(handle, "CAENHV_SetChParam")?;
        let key = (address.clone(), board, channel, name.to_string());
        let param = self
            .channel_params
            .get_mut(&key)
            .ok_or_else(|| failure("CAENHV_SetChParam", "Parameter not found"))?;
        if param.access == AccessMode::ReadOnly {
            return Err(failure("CAENHV_SetChParam", "Parameter is read-only"));
        }
        param.value = value.clone();
        self.writes.push(Write {
            address,
            board,
            channel,
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn get_channel_parameter_property(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
        property: Property,
    ) -> Result<PropertyValue> {
        let call = "CAENHV_GetChParamProp";
        let param = self.param(handle, board, channel, name, call)?;
        match property {
            Property::Type => Ok(PropertyValue::Type(param.kind)),
            Property::Mode => Ok(PropertyValue::Mode(param.access)),
            Property::Unit => param
                .unit
                .map(|(unit, _)| PropertyValue::Unit(unit))
                .ok_or_else(|| failure(call, "Property not found")),
            Property::Exponent => param
                .unit
                .map(|(_, exp)| PropertyValue::Exponent(exp))
                .ok_or_else(|| failure(call, "Property not found")),
            _ => Err(failure(call, "Property not found")),
        }
    }

    fn channel_parameter_names(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
    ) -> Result<Vec<String>> {
        let address = self.address(handle, "CAENHV_GetChParamInfo")?;
        let mut names: Vec<String> = self
            .channel_params
            .keys()
            .filter(|(a, b, c, _)| *a == address && *b == board && *c == channel)
            .map(|(_, _, _, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn get_board_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        name: &str,
    ) -> Result<ParamValue> {
        let address = self.address(handle, "CAENHV_GetBdParam")?;
        self.board_params
            .get(&(address, board, name.to_string()))
            .cloned()
            .ok_or_else(|| failure("CAENHV_GetBdParam", "Parameter not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(mock: &mut MockLibrary, address: &str) -> SystemHandle {
        mock.init_system(SystemType::Sy5527, LinkType::TcpIp, address, "", "")
            .unwrap()
    }

    #[test]
    fn test_handles_follow_init_order() {
        let mut mock = MockLibrary::new();
        let first = connect(&mut mock, "10.0.0.1");
        let second = connect(&mut mock, "10.0.0.2");
        assert_ne!(first, second);
        assert_eq!(mock.handle_of("10.0.0.2"), Some(second));
        assert_eq!(mock.handle_of("10.0.0.3"), None);
    }

    #[test]
    fn test_unreachable_init() {
        let mut mock = MockLibrary::new();
        mock.set_unreachable("10.0.0.9");
        let result = mock.init_system(SystemType::Sy4527, LinkType::TcpIp, "10.0.0.9", "", "");
        assert!(matches!(result, Err(Error::Library { call: "CAENHV_InitSystem", .. })));
    }

    #[test]
    fn test_write_updates_value() {
        let mut mock = MockLibrary::new();
        mock.add_channel_parameter("10.0.0.1", 2, 7, "Pw", ParamValue::OnOff(false));
        let handle = connect(&mut mock, "10.0.0.1");

        mock.set_channel_parameter(handle, 2, 7, "Pw", &ParamValue::OnOff(true))
            .unwrap();
        assert_eq!(
            mock.get_channel_parameter(handle, 2, 7, "Pw").unwrap(),
            ParamValue::OnOff(true)
        );
        assert_eq!(mock.writes().len(), 1);
        assert_eq!(mock.writes()[0].name, "Pw");

        mock.clear_writes();
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_read_only_status() {
        let mut mock = MockLibrary::new();
        mock.add_channel_parameter("10.0.0.1", 0, 0, "Status", ParamValue::Status(1));
        let handle = connect(&mut mock, "10.0.0.1");
        let result = mock.set_channel_parameter(handle, 0, 0, "Status", &ParamValue::Status(0));
        assert!(result.is_err());
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_closed_handle_rejected() {
        let mut mock = MockLibrary::new();
        mock.add_channel_parameter("10.0.0.1", 0, 0, "VMon", ParamValue::Numeric(1.0));
        let handle = connect(&mut mock, "10.0.0.1");
        mock.deinit_system(handle).unwrap();
        assert_eq!(mock.deinitialised(), &[handle]);
        assert!(mock.get_channel_parameter(handle, 0, 0, "VMon").is_err());
        assert!(mock.deinit_system(handle).is_err());
    }

    #[test]
    fn test_properties() {
        let mut mock = MockLibrary::new();
        mock.add_channel_parameter("10.0.0.1", 0, 0, "IMon", ParamValue::Numeric(2.5));
        mock.set_unit("10.0.0.1", 0, 0, "IMon", Unit::Ampere, -6);
        let handle = connect(&mut mock, "10.0.0.1");

        let unit = mock
            .get_channel_parameter_property(handle, 0, 0, "IMon", Property::Unit)
            .unwrap();
        assert_eq!(unit, PropertyValue::Unit(Unit::Ampere));
        let kind = mock
            .get_channel_parameter_property(handle, 0, 0, "IMon", Property::Type)
            .unwrap();
        assert_eq!(kind, PropertyValue::Type(ParamType::Numeric));
        assert!(
            mock.get_channel_parameter_property(handle, 0, 0, "IMon", Property::OnState)
                .is_err()
        );
    }
}
