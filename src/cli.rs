//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};

/// Parse a hex byte string like "a5010200" or "0xA5 01 02"
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let cleaned: String = s
        .trim()
        .strip_prefix("0x")
        .or_else(|| s.trim().strip_prefix("0X"))
        .unwrap_or(s.trim())
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err("Empty hex string".to_string());
    }
    if cleaned.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits: {}", cleaned.len()));
    }

    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .map_err(|e| format!("Invalid hex byte '{}': {}", &cleaned[i..i + 2], e))
        })
        .collect()
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Backend to use [available: {}]",
        programmers::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "eselink")]
#[command(author, version, about = "Secure-element SPI link control", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one raw exchange through the control plane
    Exchange {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,

        /// Request bytes as hex (e.g. a5010200)
        data: String,

        /// Bytes to clock on the wire; defaults to the request length
        #[arg(short, long)]
        len: Option<usize>,
    },

    /// Write one select-framed buffer
    Write {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,

        /// Bytes to send as hex
        data: String,
    },

    /// Read one select-framed buffer
    Read {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,

        /// Number of bytes to read
        #[arg(short, long, default_value_t = 16)]
        count: usize,
    },

    /// Reprogram the bus clock rate
    SetClock {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,

        /// Desired rate in Hz (>= 100000)
        hz: u32,
    },

    /// Resynchronize bit framing by swinging the select line
    Swing {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,

        /// Number of pulses
        #[arg(short, long, default_value_t = 7)]
        count: usize,
    },

    /// List available backends
    List,
}
