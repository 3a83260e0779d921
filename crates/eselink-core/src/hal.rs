//! Collaborator trait definitions
//!
//! The core never talks to hardware directly. Everything below the
//! sequencing state machine - the byte-shifting bus primitive, the switched
//! voltage rail, the power-management clock layer, the select line, the
//! wake hold and the secure-world monitor - is reached through these traits
//! so backends can be swapped per board and mocked in tests.
//!
//! Every potentially blocking call takes a `Duration` deadline and may
//! return [`Error::Timeout`](crate::error::Error::Timeout); none of the
//! underlying hardware layers offer cancellation once a call is issued.
//! A backend that cannot bound the underlying primitive must document
//! that the deadline is advisory.

use crate::error::Result;
use std::time::Duration;

/// Raw synchronous full-duplex exchange primitive.
///
/// One call shifts `tx.len()` bytes out while clocking the same number of
/// bytes into `rx`. Callers guarantee `tx.len() == rx.len()`. The bus also
/// carries the link's configured target speed, which the clock gate reads
/// when raising the clock.
pub trait SpiBus: Send {
    /// Perform one full-duplex exchange of `tx.len()` bytes.
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], timeout: Duration) -> Result<()>;

    /// Currently configured target speed in Hz.
    fn max_speed(&self) -> u32;

    /// Record a new target speed in Hz.
    fn set_max_speed(&mut self, hz: u32) -> Result<()>;
}

/// A claimed handle on the switched voltage supply powering the chip.
///
/// Handles are scoped: they are claimed from a [`RailProvider`] per
/// operation and release the underlying resource when dropped.
pub trait PowerRail: Send {
    fn enable(&mut self, timeout: Duration) -> Result<()>;
    fn disable(&mut self, timeout: Duration) -> Result<()>;
}

/// Named-rail lookup.
///
/// `claim` resolves a rail by name for the duration of one power operation;
/// failure to resolve maps to
/// [`Error::DeviceUnavailable`](crate::error::Error::DeviceUnavailable).
pub trait RailProvider: Send {
    fn claim(&mut self, name: &str) -> Result<Box<dyn PowerRail>>;
}

/// Power-management layer feeding the bus clock source.
///
/// `raise`/`lower` descend into a layer that may suspend the caller; they
/// are the gate's blocking points. `set_rate` reprograms the source clock.
pub trait ClockSource: Send {
    fn raise(&mut self, timeout: Duration) -> Result<()>;
    fn lower(&mut self, timeout: Duration) -> Result<()>;
    fn set_rate(&mut self, hz: u32) -> Result<()>;
}

/// Chip-select line driver.
///
/// `set` drives the electrical level: `true` is high (de-asserted, the
/// framing line is active-low), `false` is low (asserted).
pub trait SelectLine: Send {
    fn set(&mut self, high: bool) -> Result<()>;
}

/// Wake-hold hint keeping the host awake while the link is clocked.
pub trait WakeHold: Send {
    fn acquire(&mut self);
    fn release(&mut self);
    fn is_held(&self) -> bool;
}

/// Secure-world monitor used by the secure power strategy to hand the bus
/// over before the clock is touched.
pub trait SecureMonitor: Send {
    fn resume(&mut self) -> Result<()>;
    fn suspend(&mut self) -> Result<()>;
}
