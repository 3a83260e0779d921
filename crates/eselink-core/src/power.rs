//! Power rail control and the power strategy seam
//!
//! The rail is a scoped acquisition: every power flip claims the named rail
//! from the provider, applies the change and drops the handle, so the
//! resource is released on every path. The secure/non-secure split is a
//! strategy object rather than a compile-time branch: both variants are
//! selectable at construction and testable in one binary.

use crate::error::Result;
use crate::hal::{ClockSource, SecureMonitor};
use crate::link::LinkInner;
use std::time::Duration;

/// Board pin-multiplexing states applied around the session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    /// Bus pins routed for active use
    Default,
    /// Bus pins parked for the powered-off chip
    PowerOff,
}

/// Capability object standing in for the compile-time secure/direct split.
///
/// `raise_clock`/`lower_clock` wrap the descent into the power-management
/// layer; `configure_pins` is the board pin-mux hook run on open and close;
/// `direct_io` reports whether framed read/write operations are available
/// (the secure variant funnels all data through the raw transfer command).
pub trait PowerStrategy: Send {
    fn raise_clock(&mut self, clock: &mut dyn ClockSource, timeout: Duration) -> Result<()>;

    fn lower_clock(&mut self, clock: &mut dyn ClockSource, timeout: Duration) -> Result<()>;

    fn configure_pins(&mut self, _state: PinState) -> Result<()> {
        Ok(())
    }

    fn direct_io(&self) -> bool {
        true
    }
}

/// Non-secure strategy: the clock layer is driven directly.
pub struct DirectPower;

impl PowerStrategy for DirectPower {
    fn raise_clock(&mut self, clock: &mut dyn ClockSource, timeout: Duration) -> Result<()> {
        clock.raise(timeout)
    }

    fn lower_clock(&mut self, clock: &mut dyn ClockSource, timeout: Duration) -> Result<()> {
        clock.lower(timeout)
    }
}

/// Secure strategy: the bus belongs to the secure world while clocked.
///
/// Each clock transition is bracketed by a monitor call handing the bus
/// over, and direct read/write is unavailable - data moves exclusively
/// through the raw transfer command.
pub struct SecurePower {
    monitor: Box<dyn SecureMonitor>,
}

impl SecurePower {
    pub fn new(monitor: Box<dyn SecureMonitor>) -> Self {
        Self { monitor }
    }
}

impl PowerStrategy for SecurePower {
    fn raise_clock(&mut self, clock: &mut dyn ClockSource, timeout: Duration) -> Result<()> {
        self.monitor.resume()?;
        clock.raise(timeout)
    }

    fn lower_clock(&mut self, clock: &mut dyn ClockSource, timeout: Duration) -> Result<()> {
        self.monitor.suspend()?;
        clock.lower(timeout)
    }

    fn direct_io(&self) -> bool {
        false
    }
}

impl LinkInner {
    /// Flip the chip's voltage rail.
    ///
    /// The rail handle is claimed per call and dropped on every path,
    /// success or failure. An unresolvable rail is `DeviceUnavailable`;
    /// a failed flip carries the backend's hardware code.
    pub(crate) fn set_power(&mut self, on: bool) -> Result<()> {
        let mut rail = self.rails.claim(&self.config.rail_name)?;
        if self.config.debug.enabled() {
            log::debug!("rail {}: {}", self.config.rail_name, if on { "on" } else { "off" });
        }
        let res = if on {
            rail.enable(self.config.power_timeout)
        } else {
            rail.disable(self.config.power_timeout)
        };
        if let Err(e) = res {
            log::error!(
                "failed to turn {} rail {}: {}",
                if on { "on" } else { "off" },
                self.config.rail_name,
                e
            );
            return Err(e);
        }
        Ok(())
    }
}
