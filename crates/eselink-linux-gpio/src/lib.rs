//! eselink-linux-gpio - Linux GPIO backend
//!
//! This crate provides the GPIO-wired collaborators for eselink using the
//! Linux character device GPIO interface (gpiocdev): the chip-select
//! framing line, an LDO-enable-switched voltage rail and the chip's
//! edge-triggered notification line.
//!
//! The gpiocdev crate is the modern way to access GPIO on Linux,
//! replacing the deprecated sysfs interface.
//!
//! # Example
//!
//! ```no_run
//! use eselink_linux_gpio::{GpioRailProvider, GpioSelectLine};
//!
//! let select = GpioSelectLine::open("/dev/gpiochip0", 25)?;
//! let rails = GpioRailProvider::open("/dev/gpiochip0", 24)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel 4.8+ with GPIO character device support
//! - Access to `/dev/gpiochipN` devices (may require root or udev rules)

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, GpioConfig, GpioIrqLine, GpioRail, GpioRailProvider, GpioSelectLine};
pub use error::{LinuxGpioError, Result};
