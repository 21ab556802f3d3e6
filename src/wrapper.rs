//! [`HvLibrary`] over the vendor `libcaenhvwrapper` shared library.
//!
//! The library must be installed where the linker can find it, e.g. `/usr/lib`.

use std::{
    ffi::{CStr, CString, c_char, c_int, c_uchar, c_ushort, c_void},
    ptr,
};

use log::trace;

use crate::{
    error::{Error, Result},
    library::HvLibrary,
    types::{
        AccessMode, CrateMap, LinkType, ParamType, ParamValue, Property, PropertyValue,
        SlotInfo, SystemHandle, SystemType, Unit,
    },
};

/// Size of one entry of the list returned by `CAENHV_GetChParamInfo`.
const MAX_PARAM_NAME: usize = 10;
/// Buffer size for string parameter values.
const MAX_STRING_VALUE: usize = 1024;
/// Buffer size for the `Onstate`/`Offstate` properties.
const MAX_STATE_NAME: usize = 32;

#[link(name = "caenhvwrapper")]
unsafe extern "C" {
    fn CAENHV_InitSystem(
        system: c_int,
        link_type: c_int,
        arg: *mut c_void,
        user_name: *const c_char,
        passwd: *const c_char,
        handle: *mut c_int,
    ) -> c_int;
    fn CAENHV_DeinitSystem(handle: c_int) -> c_int;
    fn CAENHV_GetCrateMap(
        handle: c_int,
        nr_of_slot: *mut c_ushort,
        nr_of_ch_list: *mut *mut c_ushort,
        model_list: *mut *mut c_char,
        description_list: *mut *mut c_char,
        ser_num_list: *mut *mut c_ushort,
        fmw_rel_min_list: *mut *mut c_uchar,
        fmw_rel_max_list: *mut *mut c_uchar,
    ) -> c_int;
    fn CAENHV_GetChParam(
        handle: c_int,
        slot: c_ushort,
        par_name: *const c_char,
        ch_num: c_ushort,
        ch_list: *const c_ushort,
        par_val_list: *mut c_void,
    ) -> c_int;
    fn CAENHV_SetChParam(
        handle: c_int,
        slot: c_ushort,
        par_name: *const c_char,
        ch_num: c_ushort,
        ch_list: *const c_ushort,
        par_value: *mut c_void,
    ) -> c_int;
    fn CAENHV_GetChParamProp(
        handle: c_int,
        slot: c_ushort,
        ch: c_ushort,
        par_name: *const c_char,
        prop_name: *const c_char,
        retval: *mut c_void,
    ) -> c_int;
    fn CAENHV_GetChParamInfo(
        handle: c_int,
        slot: c_ushort,
        ch: c_ushort,
        par_name_list: *mut *mut c_char,
        par_number: *mut c_int,
    ) -> c_int;
    fn CAENHV_GetBdParam(
        handle: c_int,
        slot_num: c_ushort,
        slot_list: *const c_ushort,
        par_name: *const c_char,
        par_val_list: *mut c_void,
    ) -> c_int;
    fn CAENHV_GetBdParamProp(
        handle: c_int,
        slot: c_ushort,
        par_name: *const c_char,
        prop_name: *const c_char,
        retval: *mut c_void,
    ) -> c_int;
    fn CAENHV_GetError(handle: c_int) -> *mut c_char;
    fn CAENHV_Free(arg: *mut c_void) -> c_int;
}

/// Handle-free access to the process-wide CAEN HV wrapper library.
#[derive(Debug, Default)]
pub struct CaenHvWrapper;

impl CaenHvWrapper {
    pub fn new() -> Self {
        Self
    }

    fn channel_property_raw(
        &self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &CStr,
        property: Property,
        out: *mut c_void,
    ) -> Result<()> {
        let property: &'static str = property.into();
        let property = cstring(property)?;
        // SAFETY: `out` points to a buffer large enough for the requested property.
        let code = unsafe {
            CAENHV_GetChParamProp(
                handle.0,
                board,
                channel,
                name.as_ptr(),
                property.as_ptr(),
                out,
            )
        };
        check(Some(handle), "CAENHV_GetChParamProp", code)
    }

    fn channel_param_type(
        &self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &CStr,
    ) -> Result<ParamType> {
        let mut raw: u32 = 0;
        self.channel_property_raw(
            handle,
            board,
            channel,
            name,
            Property::Type,
            ptr::from_mut(&mut raw).cast(),
        )?;
        ParamType::try_from(raw).map_err(|_| unsupported(name))
    }

    fn read_channel_raw(
        &self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &CStr,
        out: *mut c_void,
    ) -> Result<()> {
        let ch_list = [channel];
        // SAFETY: one channel requested, `out` holds one value of the parameter's type.
        let code = unsafe {
            CAENHV_GetChParam(handle.0, board, name.as_ptr(), 1, ch_list.as_ptr(), out)
        };
        check(Some(handle), "CAENHV_GetChParam", code)
    }

    fn write_channel_raw(
        &self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &CStr,
        value: *mut c_void,
    ) -> Result<()> {
        let ch_list = [channel];
        // SAFETY: one channel addressed, `value` points to a value of the parameter's type.
        let code = unsafe {
            CAENHV_SetChParam(handle.0, board, name.as_ptr(), 1, ch_list.as_ptr(), value)
        };
        check(Some(handle), "CAENHV_SetChParam", code)
    }
}

impl HvLibrary for CaenHvWrapper {
    fn init_system(
        &mut self,
        system: SystemType,
        link: LinkType,
        address: &str,
        username: &str,
        password: &str,
    ) -> Result<SystemHandle> {
        let address = cstring(address)?;
        let username = cstring(username)?;
        let password = cstring(password)?;
        let mut handle: c_int = -1;
        // SAFETY: all strings are NUL-terminated and outlive the call.
        let code = unsafe {
            CAENHV_InitSystem(
                system as c_int,
                link as c_int,
                address.as_ptr().cast_mut().cast(),
                username.as_ptr(),
                password.as_ptr(),
                &mut handle,
            )
        };
        check(None, "CAENHV_InitSystem", code)?;
        trace!("CAENHV_InitSystem -> handle {}", handle);
        Ok(SystemHandle(handle))
    }

    fn deinit_system(&mut self, handle: SystemHandle) -> Result<()> {
        // SAFETY: plain integer argument.
        let code = unsafe { CAENHV_DeinitSystem(handle.0) };
        check(Some(handle), "CAENHV_DeinitSystem", code)
    }

    fn crate_map(&mut self, handle: SystemHandle) -> Result<CrateMap> {
        let mut nr_of_slot: c_ushort = 0;
        let mut channels: *mut c_ushort = ptr::null_mut();
        let mut models: *mut c_char = ptr::null_mut();
        let mut descriptions: *mut c_char = ptr::null_mut();
        let mut serials: *mut c_ushort = ptr::null_mut();
        let mut fmw_min: *mut c_uchar = ptr::null_mut();
        let mut fmw_max: *mut c_uchar = ptr::null_mut();
        // SAFETY: every out-pointer refers to a local.
        let code = unsafe {
            CAENHV_GetCrateMap(
                handle.0,
                &mut nr_of_slot,
                &mut channels,
                &mut models,
                &mut descriptions,
                &mut serials,
                &mut fmw_min,
                &mut fmw_max,
            )
        };
        check(Some(handle), "CAENHV_GetCrateMap", code)?;

        let mut slots = Vec::with_capacity(nr_of_slot as usize);
        let mut model_ptr = models.cast_const();
        let mut description_ptr = descriptions.cast_const();
        for i in 0..nr_of_slot as usize {
            // SAFETY: each numeric list holds `nr_of_slot` entries, the string lists hold
            // `nr_of_slot` consecutive NUL-terminated strings.
            unsafe {
                let model = CStr::from_ptr(model_ptr);
                let description = CStr::from_ptr(description_ptr);
                slots.push(SlotInfo {
                    model: model.to_string_lossy().into_owned(),
                    description: description.to_string_lossy().into_owned(),
                    channels: *channels.add(i),
                    serial_number: *serials.add(i),
                    firmware: (*fmw_max.add(i), *fmw_min.add(i)),
                });
                model_ptr = model_ptr.add(model.to_bytes_with_nul().len());
                description_ptr = description_ptr.add(description.to_bytes_with_nul().len());
            }
        }

        for list in [
            channels.cast::<c_void>(),
            models.cast(),
            descriptions.cast(),
            serials.cast(),
            fmw_min.cast(),
            fmw_max.cast(),
        ] {
            // SAFETY: every list was allocated by the library for this call.
            unsafe { CAENHV_Free(list) };
        }
        Ok(CrateMap { slots })
    }

    fn get_channel_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
    ) -> Result<ParamValue> {
        let name = cstring(name)?;
        let kind = self.channel_param_type(handle, board, channel, &name)?;
        match kind {
            ParamType::Numeric => {
                let mut value: f32 = 0.0;
                self.read_channel_raw(handle, board, channel, &name, ptr::from_mut(&mut value).cast())?;
                Ok(ParamValue::Numeric(value))
            }
            ParamType::String => {
                let mut buffer = [0u8; MAX_STRING_VALUE];
                self.read_channel_raw(handle, board, channel, &name, buffer.as_mut_ptr().cast())?;
                Ok(ParamValue::Text(text_from(&buffer)))
            }
            ParamType::Command => Err(unsupported(&name)),
            word_kind => {
                let mut word: u32 = 0;
                self.read_channel_raw(handle, board, channel, &name, ptr::from_mut(&mut word).cast())?;
                Ok(word_value(word_kind, word))
            }
        }
    }

    fn set_channel_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
        value: &ParamValue,
    ) -> Result<()> {
        let name = cstring(name)?;
        match value {
            ParamValue::Numeric(v) => {
                let mut v = *v;
                self.write_channel_raw(handle, board, channel, &name, ptr::from_mut(&mut v).cast())
            }
            ParamValue::Text(text) => {
                let text = cstring(text)?;
                self.write_channel_raw(handle, board, channel, &name, text.as_ptr().cast_mut().cast())
            }
            other => {
                let Some(mut word) = other.as_word() else {
                    return Err(unsupported(&name));
                };
                self.write_channel_raw(handle, board, channel, &name, ptr::from_mut(&mut word).cast())
            }
        }
    }

    fn get_channel_parameter_property(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
        name: &str,
        property: Property,
    ) -> Result<PropertyValue> {
        let name = cstring(name)?;
        match property {
            Property::Type => {
                let kind = self.channel_param_type(handle, board, channel, &name)?;
                Ok(PropertyValue::Type(kind))
            }
            Property::Mode => {
                let mut raw: u32 = 0;
                self.channel_property_raw(handle, board, channel, &name, property, ptr::from_mut(&mut raw).cast())?;
                AccessMode::try_from(raw)
                    .map(PropertyValue::Mode)
                    .map_err(|_| unsupported(&name))
            }
            Property::MinValue | Property::MaxValue => {
                let mut value: f32 = 0.0;
                self.channel_property_raw(handle, board, channel, &name, property, ptr::from_mut(&mut value).cast())?;
                Ok(PropertyValue::Numeric(value))
            }
            Property::Unit => {
                let mut raw: u16 = 0;
                self.channel_property_raw(handle, board, channel, &name, property, ptr::from_mut(&mut raw).cast())?;
                Unit::try_from(raw)
                    .map(PropertyValue::Unit)
                    .map_err(|_| unsupported(&name))
            }
            Property::Exponent => {
                let mut exp: i8 = 0;
                self.channel_property_raw(handle, board, channel, &name, property, ptr::from_mut(&mut exp).cast())?;
                Ok(PropertyValue::Exponent(exp))
            }
            Property::OnState | Property::OffState => {
                let mut buffer = [0u8; MAX_STATE_NAME];
                self.channel_property_raw(handle, board, channel, &name, property, buffer.as_mut_ptr().cast())?;
                Ok(PropertyValue::Text(text_from(&buffer)))
            }
        }
    }

    fn channel_parameter_names(
        &mut self,
        handle: SystemHandle,
        board: u16,
        channel: u16,
    ) -> Result<Vec<String>> {
        let mut list: *mut c_char = ptr::null_mut();
        let mut count: c_int = 0;
        // SAFETY: both out-pointers refer to locals.
        let code = unsafe { CAENHV_GetChParamInfo(handle.0, board, channel, &mut list, &mut count) };
        check(Some(handle), "CAENHV_GetChParamInfo", code)?;

        let count = usize::try_from(count).unwrap_or(0);
        let mut names = Vec::with_capacity(count);
        for i in 0..count {
            // SAFETY: the list holds `count` names, each in its own MAX_PARAM_NAME byte cell.
            let name = unsafe { CStr::from_ptr(list.add(i * MAX_PARAM_NAME)) };
            names.push(name.to_string_lossy().into_owned());
        }
        // SAFETY: allocated by the library for this call.
        unsafe { CAENHV_Free(list.cast()) };
        Ok(names)
    }

    fn get_board_parameter(
        &mut self,
        handle: SystemHandle,
        board: u16,
        name: &str,
    ) -> Result<ParamValue> {
        let name = cstring(name)?;
        let mut raw_type: u32 = 0;
        // SAFETY: the `Type` property is a 32 bit unsigned value.
        let code = unsafe {
            CAENHV_GetBdParamProp(
                handle.0,
                board,
                name.as_ptr(),
                c"Type".as_ptr(),
                ptr::from_mut(&mut raw_type).cast(),
            )
        };
        check(Some(handle), "CAENHV_GetBdParamProp", code)?;
        let kind = ParamType::try_from(raw_type).map_err(|_| unsupported(&name))?;

        let slot_list = [board];
        let read = |out: *mut c_void| {
            // SAFETY: one slot requested, `out` holds one value of the parameter's type.
            let code = unsafe {
                CAENHV_GetBdParam(handle.0, 1, slot_list.as_ptr(), name.as_ptr(), out)
            };
            check(Some(handle), "CAENHV_GetBdParam", code)
        };
        match kind {
            ParamType::Numeric => {
                let mut value: f32 = 0.0;
                read(ptr::from_mut(&mut value).cast())?;
                Ok(ParamValue::Numeric(value))
            }
            ParamType::String => {
                let mut buffer = [0u8; MAX_STRING_VALUE];
                read(buffer.as_mut_ptr().cast())?;
                Ok(ParamValue::Text(text_from(&buffer)))
            }
            ParamType::Command => Err(unsupported(&name)),
            word_kind => {
                let mut word: u32 = 0;
                read(ptr::from_mut(&mut word).cast())?;
                Ok(word_value(word_kind, word))
            }
        }
    }
}

fn word_value(kind: ParamType, word: u32) -> ParamValue {
    match kind {
        ParamType::OnOff => ParamValue::OnOff(word != 0),
        ParamType::ChannelStatus | ParamType::BoardStatus => ParamValue::Status(word),
        ParamType::Binary => ParamValue::Binary(word),
        _ => ParamValue::Enum(word),
    }
}

fn check(handle: Option<SystemHandle>, call: &'static str, code: c_int) -> Result<()> {
    if code == 0 {
        return Ok(());
    }
    let message = match handle {
        // SAFETY: the library returns a NUL-terminated message it keeps ownership of.
        Some(handle) => unsafe {
            let text = CAENHV_GetError(handle.0);
            if text.is_null() {
                String::new()
            } else {
                CStr::from_ptr(text).to_string_lossy().into_owned()
            }
        },
        None => String::from("no connection"),
    };
    Err(Error::Library {
        call,
        code,
        message,
    })
}

fn cstring(value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::InvalidName(value.to_string()))
}

fn unsupported(name: &CStr) -> Error {
    Error::UnsupportedType {
        name: name.to_string_lossy().into_owned(),
    }
}

fn text_from(buffer: &[u8]) -> String {
    CStr::from_bytes_until_nul(buffer)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(buffer).into_owned())
}
