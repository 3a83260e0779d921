//! eselink-linux-spi - Linux spidev bus backend
//!
//! This crate provides the raw full-duplex exchange primitive for eselink
//! via the `/dev/spidevX.Y` device interface.
//!
//! # Overview
//!
//! The kernel exposes SPI controllers through character devices at
//! `/dev/spidevX.Y` where X is the bus number and Y is the chip select.
//! The secure element's select line is *not* the controller's native CS -
//! framing is driven separately through a GPIO line (see
//! `eselink-linux-gpio`), so each exchange here runs with `cs_change = 0`
//! and the controller select left alone.
//!
//! # Example
//!
//! ```no_run
//! use eselink_linux_spi::{SpidevBus, SpidevConfig};
//!
//! // Open with default settings (1 MHz, mode 3)
//! let bus = SpidevBus::open_device("/dev/spidev0.0")?;
//!
//! // Or with custom settings
//! let config = SpidevConfig::new("/dev/spidev0.0")
//!     .with_speed(4_000_000)
//!     .with_mode(3);
//! let bus = SpidevBus::open(&config)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device

pub mod device;
pub mod error;

// Re-exports
pub use device::{mode, parse_options, SpidevBus, SpidevConfig};
pub use error::{LinuxSpiError, Result};

/// Open a Linux spidev device and return a boxed bus
///
/// This is a convenience function for use in the CLI backend dispatch.
///
/// # Example Options
///
/// - `dev=/dev/spidev0.0` - Required: device path
/// - `spispeed=1000` - Optional: speed in kHz (default: 1000)
/// - `mode=3` - Optional: SPI mode 0-3 (default: 3)
pub fn open_linux_spi(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn eselink_core::hal::SpiBus>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let bus = SpidevBus::open(&config)?;
    Ok(Box::new(bus))
}
