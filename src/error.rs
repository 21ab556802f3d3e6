//! Our error types for the CAEN power-supply manager.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Mode;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error type for configuring and commanding the CAEN crates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read configuration file {path}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Module {daq} does not exist in the [{}] section", .mode.section_name())]
    UnknownDaq { daq: String, mode: Mode },
    #[error("Crate index {0} is not configured")]
    UnknownCrate(usize),
    #[error("Missing configuration value `{key}` in [{section}]")]
    MissingValue { section: String, key: &'static str },
    #[error("CAEN library call {call} failed with code {code:#x}: {message}")]
    Library {
        call: &'static str,
        code: i32,
        message: String,
    },
    #[error("Parameter {name} returned an unsupported value type")]
    UnsupportedType { name: String },
    #[error("Invalid name passed to the CAEN library: {0:?}")]
    InvalidName(String),
    #[error("Output error")]
    Output(#[from] std::io::Error),
}
