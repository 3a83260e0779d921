//! Backend registration and dispatch
//!
//! This module provides a centralized registry for the link backends, with
//! support for feature-gated inclusion and dynamic help text generation.
//! A backend is selected with a `name:key=value,...` option string, e.g.
//! `linux:dev=/dev/spidev0.0,gpiochip=0,cs=25,rail=24` or `dummy:secure=1`.

use eselink_core::{Link, LinkConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unknown backend '{0}'")]
    Unknown(String),

    #[error("Invalid backend options: {0}")]
    InvalidOptions(String),

    #[error("Backend '{0}' not compiled in")]
    NotCompiled(&'static str),

    #[error("Failed to open backend: {0}")]
    OpenFailed(String),
}

/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        description: "In-memory hardware emulator (fill=<hex byte>,secure=<0|1>)",
    });

    #[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
    backends.push(BackendInfo {
        name: "linux",
        description:
            "Linux spidev + GPIO (dev=/dev/spidevX.Y,spispeed=<kHz>,mode=<0-3>,gpiochip=N,cs=N,rail=N,irq=N)",
    });

    backends
}

/// Generate a short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let names: Vec<&str> = available_backends().iter().map(|b| b.name).collect();
    if names.is_empty() {
        "none compiled in".to_string()
    } else {
        names.join(", ")
    }
}

/// Generate help text listing all available backends
pub fn backend_help() -> String {
    let backends = available_backends();
    if backends.is_empty() {
        return "No backends available (recompile with backend features enabled)".to_string();
    }

    let mut help = String::from("Available backends:\n");
    for b in &backends {
        help.push_str(&format!("  {:8} - {}\n", b.name, b.description));
    }
    help
}

/// Split a `name:key=value,...` spec into name and option pairs
fn split_spec(spec: &str) -> (&str, Vec<(&str, &str)>) {
    let (name, rest) = match spec.split_once(':') {
        Some((name, rest)) => (name, rest),
        None => (spec, ""),
    };

    let options = rest
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|kv| kv.split_once('=').unwrap_or((kv, "")))
        .collect();

    (name, options)
}

/// Open a link over the backend described by `spec`.
pub fn open_link(spec: &str) -> Result<Link, BackendError> {
    let (name, options) = split_spec(spec);

    match name {
        "dummy" => {
            #[cfg(feature = "dummy")]
            return open_dummy(&options);
            #[cfg(not(feature = "dummy"))]
            return Err(BackendError::NotCompiled("dummy"));
        }
        "linux" | "linux_spi" => {
            #[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
            return open_linux(&options);
            #[cfg(not(all(feature = "linux-spi", feature = "linux-gpio")))]
            return Err(BackendError::NotCompiled("linux"));
        }
        other => Err(BackendError::Unknown(other.to_string())),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(options: &[(&str, &str)]) -> Result<Link, BackendError> {
    use eselink_dummy::{DummyConfig, DummyHardware};

    let mut config = DummyConfig::default();
    let mut secure = false;

    for (key, value) in options {
        match *key {
            "fill" => {
                let digits = value.strip_prefix("0x").unwrap_or(value);
                config.fill = u8::from_str_radix(digits, 16)
                    .map_err(|_| BackendError::InvalidOptions(format!("bad fill: {}", value)))?;
            }
            "secure" => secure = *value != "0",
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    let hw = DummyHardware::new(config);
    let ports = if secure { hw.secure_ports() } else { hw.ports() };
    Ok(Link::new(ports, LinkConfig::default()))
}

#[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
fn open_linux(options: &[(&str, &str)]) -> Result<Link, BackendError> {
    use eselink_core::hal::RailProvider;
    use eselink_core::{DirectPower, LinkPorts};
    use eselink_linux_gpio::{GpioIrqLine, GpioRailProvider, GpioSelectLine};
    use eselink_linux_spi::SpidevBus;
    use std::time::Duration;

    const SPI_KEYS: [&str; 3] = ["dev", "spispeed", "mode"];
    const GPIO_KEYS: [&str; 4] = ["gpiochip", "cs", "rail", "irq"];

    let spi_opts: Vec<(&str, &str)> = options
        .iter()
        .filter(|(k, _)| SPI_KEYS.contains(k))
        .copied()
        .collect();
    let gpio_opts: Vec<(&str, &str)> = options
        .iter()
        .filter(|(k, _)| GPIO_KEYS.contains(k))
        .copied()
        .collect();
    for (key, value) in options {
        if !SPI_KEYS.contains(key) && !GPIO_KEYS.contains(key) {
            log::warn!("linux: Unknown option: {}={}", key, value);
        }
    }

    let spi_config =
        eselink_linux_spi::parse_options(&spi_opts).map_err(BackendError::InvalidOptions)?;
    let gpio_config =
        eselink_linux_gpio::parse_options(&gpio_opts).map_err(BackendError::InvalidOptions)?;

    let bus = SpidevBus::open(&spi_config).map_err(|e| BackendError::OpenFailed(e.to_string()))?;
    let select = GpioSelectLine::open(&gpio_config.device, gpio_config.cs)
        .map_err(|e| BackendError::OpenFailed(e.to_string()))?;

    let rails: Box<dyn RailProvider> = match gpio_config.rail {
        Some(offset) => Box::new(
            GpioRailProvider::open(&gpio_config.device, offset)
                .map_err(|e| BackendError::OpenFailed(e.to_string()))?,
        ),
        None => {
            log::warn!("linux: no rail line configured; assuming an always-on rail");
            Box::new(AlwaysOnRails)
        }
    };

    let ports = LinkPorts {
        bus: Box::new(bus),
        select: Box::new(select),
        rails,
        clock: Box::new(HostClock),
        wake: None,
        strategy: Box::new(DirectPower),
    };
    let link = Link::new(ports, LinkConfig::default());

    if let Some(offset) = gpio_config.irq {
        let irq = GpioIrqLine::open(&gpio_config.device, offset)
            .map_err(|e| BackendError::OpenFailed(e.to_string()))?;
        let notifier = link.ready_notifier();
        std::thread::spawn(move || loop {
            match irq.forward(&notifier, Duration::from_millis(500)) {
                Ok(_) => {}
                Err(e) => {
                    log::error!("irq forwarding stopped: {}", e);
                    break;
                }
            }
        });
    }

    Ok(link)
}

/// Rail provider for boards where the chip's supply is hard-wired on.
#[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
struct AlwaysOnRails;

#[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
struct AlwaysOnRail;

#[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
impl eselink_core::hal::RailProvider for AlwaysOnRails {
    fn claim(&mut self, _name: &str) -> eselink_core::Result<Box<dyn eselink_core::hal::PowerRail>> {
        Ok(Box::new(AlwaysOnRail))
    }
}

#[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
impl eselink_core::hal::PowerRail for AlwaysOnRail {
    fn enable(&mut self, _timeout: std::time::Duration) -> eselink_core::Result<()> {
        Ok(())
    }

    fn disable(&mut self, _timeout: std::time::Duration) -> eselink_core::Result<()> {
        Ok(())
    }
}

/// Clock layer stand-in: the kernel's SPI controller manages the real
/// source clock from the spidev speed setting, so raise/lower have
/// nothing to do in userspace.
#[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
struct HostClock;

#[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
impl eselink_core::hal::ClockSource for HostClock {
    fn raise(&mut self, _timeout: std::time::Duration) -> eselink_core::Result<()> {
        log::debug!("linux: clock raise (kernel-managed)");
        Ok(())
    }

    fn lower(&mut self, _timeout: std::time::Duration) -> eselink_core::Result<()> {
        log::debug!("linux: clock lower (kernel-managed)");
        Ok(())
    }

    fn set_rate(&mut self, hz: u32) -> eselink_core::Result<()> {
        log::debug!("linux: source clock rate {} Hz (kernel-managed)", hz);
        Ok(())
    }
}
