//! Linux GPIO line implementations
//!
//! This module provides the GPIO-backed collaborators for a board where
//! the secure element's framing and power are wired to plain GPIO lines,
//! using the gpiocdev character-device interface:
//!
//! - `GpioSelectLine` - the select (framing) line, driven as an output
//! - `GpioRailProvider` / `GpioRail` - a voltage rail switched by an
//!   LDO-enable line, claimed per power operation
//! - `GpioIrqLine` - the chip's notification line, watched for rising
//!   edges and forwarded into the core's readiness bridge

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{EdgeDetection, Offset, Value};
use gpiocdev::request::{Config, Request};

use eselink_core::error::{Error as CoreError, Result as CoreResult};
use eselink_core::hal::{PowerRail, RailProvider, SelectLine};
use eselink_core::ReadyNotifier;

use std::sync::Arc;
use std::time::Duration;

/// errno used when a line operation fails without a finer code
const EIO: i32 = 5;

/// Chip-select line driven through a GPIO output
pub struct GpioSelectLine {
    request: Request,
    offset: Offset,
}

impl GpioSelectLine {
    /// Request the select line as an output, parked high (de-asserted).
    pub fn open(device: &str, offset: Offset) -> Result<Self> {
        let mut cfg = Config::default();
        cfg.with_line(offset).as_output(Value::Active);

        let request = Request::from_config(cfg)
            .on_chip(device)
            .with_consumer("eselink-cs")
            .request()
            .map_err(LinuxGpioError::LineRequestFailed)?;

        log::debug!("linux_gpio: select line {} on {}", offset, device);
        Ok(Self { request, offset })
    }
}

impl SelectLine for GpioSelectLine {
    fn set(&mut self, high: bool) -> CoreResult<()> {
        let value = if high { Value::Active } else { Value::Inactive };
        self.request.set_value(self.offset, value).map_err(|e| {
            log::error!("Failed to set select line: {}", e);
            CoreError::Hardware(EIO)
        })
    }
}

/// Voltage rail switched by an LDO-enable GPIO line.
///
/// The provider owns the line request; each claim hands out a scoped
/// handle that is dropped after one power operation.
pub struct GpioRailProvider {
    request: Arc<Request>,
    offset: Offset,
}

impl GpioRailProvider {
    /// Request the enable line as an output, parked off.
    pub fn open(device: &str, offset: Offset) -> Result<Self> {
        let mut cfg = Config::default();
        cfg.with_line(offset).as_output(Value::Inactive);

        let request = Request::from_config(cfg)
            .on_chip(device)
            .with_consumer("eselink-rail")
            .request()
            .map_err(LinuxGpioError::LineRequestFailed)?;

        log::debug!("linux_gpio: rail enable line {} on {}", offset, device);
        Ok(Self {
            request: Arc::new(request),
            offset,
        })
    }
}

impl RailProvider for GpioRailProvider {
    fn claim(&mut self, name: &str) -> CoreResult<Box<dyn PowerRail>> {
        log::debug!("linux_gpio: claiming rail {}", name);
        Ok(Box::new(GpioRail {
            request: Arc::clone(&self.request),
            offset: self.offset,
        }))
    }
}

/// A claimed handle on the GPIO-switched rail
pub struct GpioRail {
    request: Arc<Request>,
    offset: Offset,
}

impl GpioRail {
    fn set(&self, value: Value) -> CoreResult<()> {
        self.request.set_value(self.offset, value).map_err(|e| {
            log::error!("Failed to switch rail: {}", e);
            CoreError::Hardware(EIO)
        })
    }
}

impl PowerRail for GpioRail {
    fn enable(&mut self, _timeout: Duration) -> CoreResult<()> {
        self.set(Value::Active)
    }

    fn disable(&mut self, _timeout: Duration) -> CoreResult<()> {
        self.set(Value::Inactive)
    }
}

/// The chip's notification line, watched for rising edges
pub struct GpioIrqLine {
    request: Request,
}

impl GpioIrqLine {
    /// Request the line with rising-edge detection.
    pub fn open(device: &str, offset: Offset) -> Result<Self> {
        let mut cfg = Config::default();
        cfg.with_line(offset)
            .with_edge_detection(EdgeDetection::RisingEdge);

        let request = Request::from_config(cfg)
            .on_chip(device)
            .with_consumer("eselink-irq")
            .request()
            .map_err(LinuxGpioError::LineRequestFailed)?;

        log::debug!("linux_gpio: irq line {} on {}", offset, device);
        Ok(Self { request })
    }

    /// Wait up to `timeout` for one edge; consume and report it.
    pub fn wait_edge(&self, timeout: Duration) -> Result<bool> {
        if !self
            .request
            .wait_edge_event(timeout)
            .map_err(LinuxGpioError::EdgeReadFailed)?
        {
            return Ok(false);
        }
        self.request
            .read_edge_event()
            .map_err(LinuxGpioError::EdgeReadFailed)?;
        Ok(true)
    }

    /// Wait for one edge and post it into the readiness bridge.
    ///
    /// The notifier drops the signal itself when the bridge is disarmed,
    /// mirroring an edge interrupt that was switched off at the source.
    pub fn forward(&self, notifier: &ReadyNotifier, timeout: Duration) -> Result<bool> {
        if self.wait_edge(timeout)? {
            Ok(notifier.signal())
        } else {
            Ok(false)
        }
    }
}

/// GPIO wiring for one link
#[derive(Debug, Clone, Default)]
pub struct GpioConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// Select line offset
    pub cs: Offset,
    /// Rail enable line offset (optional)
    pub rail: Option<Offset>,
    /// Notification line offset (optional)
    pub irq: Option<Offset>,
}

/// Parse backend options from a list of key-value pairs
///
/// # Supported Options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (required, or use gpiochip)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `cs=N` - select line offset (required)
/// - `rail=N` - rail enable line offset (optional)
/// - `irq=N` - notification line offset (optional)
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<GpioConfig, String> {
    let mut config = GpioConfig::default();
    let mut have_cs = false;
    let mut gpiochip: Option<u32> = None;

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "gpiochip" => {
                gpiochip = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid gpiochip value: {}", value))?,
                );
            }
            "cs" => {
                config.cs = value
                    .parse()
                    .map_err(|_| format!("Invalid cs value: {}", value))?;
                have_cs = true;
            }
            "rail" => {
                config.rail = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid rail value: {}", value))?,
                );
            }
            "irq" => {
                config.irq = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid irq value: {}", value))?,
                );
            }
            _ => {
                log::warn!("linux_gpio: Unknown option: {}={}", key, value);
            }
        }
    }

    // Handle dev vs gpiochip
    if config.device.is_empty() {
        if let Some(n) = gpiochip {
            if n > 9 {
                return Err("Maximum gpiochip number supported is 9".to_string());
            }
            config.device = format!("/dev/gpiochip{}", n);
        } else {
            return Err("Either 'dev' or 'gpiochip' must be specified.\n\
                 e.g. gpiochip=0,cs=25,rail=24"
                .to_string());
        }
    } else if gpiochip.is_some() {
        return Err("Only one of 'dev' or 'gpiochip' can be specified".to_string());
    }

    if !have_cs {
        return Err("Missing required parameter: cs".to_string());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_options_full() {
        let config = parse_options(&[
            ("gpiochip", "0"),
            ("cs", "25"),
            ("rail", "24"),
            ("irq", "23"),
        ])
        .unwrap();
        assert_eq!(config.device, "/dev/gpiochip0");
        assert_eq!(config.cs, 25);
        assert_eq!(config.rail, Some(24));
        assert_eq!(config.irq, Some(23));
    }

    #[test]
    fn parse_options_requires_cs() {
        assert!(parse_options(&[("gpiochip", "0")]).is_err());
    }

    #[test]
    fn parse_options_rejects_dev_and_gpiochip() {
        assert!(parse_options(&[("dev", "/dev/gpiochip0"), ("gpiochip", "0"), ("cs", "1")]).is_err());
    }
}
