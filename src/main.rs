//! eselink - secure-element SPI link control tool
//!
//! # Architecture
//!
//! The tool drives one logical link to a secure-element chip through the
//! `eselink-core` state machine: power rail, clock gate, chip-select
//! sequencing and the bounded transfer engine. Hardware is reached through
//! swappable backends:
//! - **linux** - spidev for the byte exchange plus GPIO lines for select,
//!   rail and the chip's notification edge
//! - **dummy** - in-memory emulated hardware for testing without a board
//!
//! Every subcommand runs one complete session (open, operate, close), the
//! way a consumer of the character device would.

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::Exchange { backend, data, len } => {
            let bytes = cli::parse_hex_bytes(&data)?;
            let link = programmers::open_link(&backend)?;
            commands::exchange::run(&link, &bytes, len).map_err(Into::into)
        }
        Commands::Write { backend, data } => {
            let bytes = cli::parse_hex_bytes(&data)?;
            let link = programmers::open_link(&backend)?;
            commands::session::run_write(&link, &bytes).map_err(Into::into)
        }
        Commands::Read { backend, count } => {
            let link = programmers::open_link(&backend)?;
            commands::session::run_read(&link, count).map_err(Into::into)
        }
        Commands::SetClock { backend, hz } => {
            let link = programmers::open_link(&backend)?;
            commands::clock::run_set_clock(&link, hz).map_err(Into::into)
        }
        Commands::Swing { backend, count } => {
            let link = programmers::open_link(&backend)?;
            commands::swing::run_swing(&link, count).map_err(Into::into)
        }
        Commands::List => {
            print!("{}", programmers::backend_help());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
