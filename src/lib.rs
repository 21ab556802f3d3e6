//! This crate configures and commands the CAEN power-supply crates of the SND detector.
//!
//! DAQ boards are addressed by their logical name (e.g. `m1x1`). A TOML configuration file
//! maps every name onto a (crate, board, channel) triple, separately for the low voltage of
//! the DAQ boards (`[board]`) and the SiPM bias high voltage (`[bias]`). All communication
//! with the crates goes through the vendor CAEN HV wrapper library.
//!
//! Example configuration:
//!
//! ```toml
//! [[crates]]
//! module = "SY5527"
//! linktype = "TCPIP"
//! address = "192.168.0.10"
//! username = "admin"
//! password = "admin"
//!
//! [board.default]
//! v = 12.0
//!
//! [board.m1x1]
//! crate = 0
//! board = 3
//! channel = 0
//!
//! [bias.default]
//! ov = 3.5
//! v_offset_tofpet = 0.75
//!
//! [bias.m1x1]
//! crate = 0
//! board = 0
//! channel = 4
//! v_bd = 52.3
//! ```
//!
//! Crate systems known to the wrapper library:
//! * SY1527, SY2527, SY4527, SY5527
//! * N568, N568E, N1470, N1068, N1168
//! * V65XX, V8100
//! * DT55XX, DT55XXE
//! * FTK, SMARTHV, NGPS, R6060
//!
//! The `wrapper` feature links against `libcaenhvwrapper` and builds the `snd-caen` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod manager;
pub mod parameter;
pub mod report;
pub mod status;
pub mod types;
#[cfg(feature = "wrapper")]
pub mod wrapper;

pub use config::Config;
pub use error::{Error, Result};
pub use library::HvLibrary;
pub use manager::CaenManager;

#[cfg(test)]
mod mock_library;
