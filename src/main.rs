use clap::Parser;
use log::error;

use snd_caen::{cli::Cli, wrapper::CaenHvWrapper};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    if let Err(err) = snd_caen::cli::run(&cli, CaenHvWrapper::new(), &mut stdout) {
        error!("{}", err);
        std::process::exit(1);
    }
}
