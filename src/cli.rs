//! Command line interface of the `snd-caen` binary.

use std::{io::Write, path::PathBuf};

use clap::{Parser, Subcommand};

use crate::{
    error::Result,
    library::HvLibrary,
    manager::CaenManager,
    types::{HvMode, Mode},
};

/// Configure and command the SND CAEN LV and HV crates.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "snd_caen.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Low voltage of the DAQ boards
    Lv {
        #[command(subcommand)]
        action: LvAction,
    },
    /// Change the HV power mode. No DAQ names means every board
    Hv { mode: HvMode, daqs: Vec<String> },
    /// Set the SiPM over-voltage in volts
    Ov {
        #[arg(allow_negative_numbers = true)]
        ov: f64,
        daqs: Vec<String>,
    },
    /// Print every parameter of the channels
    Info { mode: Mode, daqs: Vec<String> },
    /// Print one parameter of the channels
    Param {
        name: String,
        mode: Mode,
        daqs: Vec<String>,
    },
    /// Decode the channel status words
    Status { mode: Mode, daqs: Vec<String> },
    /// Decode the board status words
    BoardStatus { mode: Mode, daqs: Vec<String> },
    /// Print the boards installed in every crate
    Map,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum LvAction {
    /// Switch the LV on
    On { daqs: Vec<String> },
    /// Switch the LV off
    Off { daqs: Vec<String> },
    /// Set the LV set-point
    Set {
        /// Volts, defaults to the configured value
        #[arg(short, long)]
        voltage: Option<f64>,
        daqs: Vec<String>,
    },
}

/// Connect using the configuration file, execute the command and disconnect.
pub fn run<L: HvLibrary>(cli: &Cli, library: L, out: &mut impl Write) -> Result<()> {
    let mut manager = CaenManager::from_path(library, &cli.config)?;
    execute(&mut manager, &cli.command, out)?;
    manager.close()
}

/// Execute one command, printing reports to `out`.
pub fn execute<L: HvLibrary>(
    manager: &mut CaenManager<L>,
    command: &Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Lv { action } => match action {
            LvAction::On { daqs } => manager.switch_lv(true, selection(daqs).as_deref()),
            LvAction::Off { daqs } => manager.switch_lv(false, selection(daqs).as_deref()),
            LvAction::Set { voltage, daqs } => manager.set_lv(*voltage, selection(daqs).as_deref()),
        },
        Command::Hv { mode, daqs } => manager.switch_hv(*mode, selection(daqs).as_deref()),
        Command::Ov { ov, daqs } => manager.override_ov(*ov, selection(daqs).as_deref()),
        Command::Info { mode, daqs } => {
            for info in manager.channel_info(*mode, selection(daqs).as_deref())? {
                writeln!(out, "{}\n", info)?;
            }
            Ok(())
        }
        Command::Param { name, mode, daqs } => {
            for reading in manager.channel_parameters(name, *mode, selection(daqs).as_deref())? {
                writeln!(out, "{}", reading)?;
            }
            Ok(())
        }
        Command::Status { mode, daqs } => {
            for report in manager.check_status(*mode, selection(daqs).as_deref())? {
                writeln!(out, "{}", report)?;
            }
            Ok(())
        }
        Command::BoardStatus { mode, daqs } => {
            for report in manager.check_board_status(*mode, selection(daqs).as_deref())? {
                writeln!(out, "{}", report)?;
            }
            Ok(())
        }
        Command::Map => {
            for (index, map) in manager.crate_maps().iter().enumerate() {
                writeln!(out, "Crate {}:", index)?;
                write!(out, "{}", map)?;
            }
            Ok(())
        }
    }
}

/// No names selects every DAQ.
fn selection(daqs: &[String]) -> Option<Vec<&str>> {
    if daqs.is_empty() {
        None
    } else {
        Some(daqs.iter().map(String::as_str).collect())
    }
}
