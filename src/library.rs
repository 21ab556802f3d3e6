//! The seam between the manager and the vendor HV wrapper library.

use crate::{
    error::Result,
    types::{CrateMap, LinkType, ParamValue, Property, PropertyValue, SystemHandle, SystemType},
};

/// Access to CAEN power-supply crates.
///
/// Implemented over `libcaenhvwrapper` by [`CaenHvWrapper`](crate::wrapper::CaenHvWrapper)
/// when the `wrapper` feature is enabled. `board` is always the slot number inside the crate.
pub trait HvLibrary {
    /// Open a connection to a crate controller.
    fn init_system(
        &mut self,
        system: SystemType,
        link: LinkType,
        address: &str,
        username: &str,
        password: &str,
    ) -> Result<SystemHandle>;

    /// Close a connection opened by [`Self::init_system`].
    fn deinit_system(&mut self, handle: SystemHandle) -> Result<()>;

    /// Describe every slot of the crate.
    fn crate_map(&mut self, handle: SystemHandle) -> Result<CrateMap>;

    fn get_channel_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
    ) -> Result<ParamValue>;

    fn set_channel_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
        value: &ParamValue,
    ) -> Result<()>;

    fn get_channel_parameter_property(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
        property: Property,
    ) -> Result<PropertyValue>;

    /// Names of all parameters a channel exposes.
    fn channel_parameter_names(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
    ) -> Result<Vec<String>>;

    fn get_board_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        name: &str,
    ) -> Result<ParamValue>;
}

impl<L: HvLibrary + ?Sized> HvLibrary for &mut L {
    fn init_system(
        &mut self,
        system: SystemType,
        link: LinkType,
        address: &str,
        username: &str,
        password: &str,
    ) -> Result<SystemHandle> {
        (**self).init_system(system, link, address, username, password)
    }

    fn deinit_system(&mut self, handle: SystemHandle) -> Result<()> {
        (**self).deinit_system(handle)
    }

    fn crate_map(&mut self, handle: SystemHandle) -> Result<CrateMap> {
        (**self).crate_map(handle)
    }

    fn get_channel_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
    ) -> Result<ParamValue> {
        (**self).get_channel_parameter(handle, board, channel, name)
    }

    fn set_channel_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
        value: &ParamValue,
    ) -> Result<()> {
        (**self).set_channel_parameter(handle, board, channel, name, value)
    }

    fn get_channel_parameter_property(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
        property: Property,
    ) -> Result<PropertyValue> {
        (**self).get_channel_parameter_property(handle, board, channel, name, property)
    }

    fn channel_parameter_names(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
    ) -> Result<Vec<String>> {
        (**self).channel_parameter_names(handle, board, channel)
    }

    fn get_board_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        name: &str,
    ) -> Result<ParamValue> {
        (**self).get_board_parameter(handle, board, name)
    }
}
