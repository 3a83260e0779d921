//! eselink-core - control layer for a secure-element chip on a
//! synchronous serial bus
//!
//! The crate exposes a single logical [`Link`](link::Link) per attached
//! chip: open it, power it, exchange bounded byte buffers, reconfigure bus
//! timing, close it and power it down cleanly. The byte transfer itself is
//! a trivial full-duplex primitive supplied by a backend; what lives here
//! is the power/clock/chip-select sequencing state machine and the
//! single-writer discipline that makes that sequencing safe under
//! open/close races, control-plane mode changes and interrupt-driven
//! wakeups.
//!
//! Hardware is reached only through the traits in [`hal`], so the same
//! state machine runs against spidev/gpiocdev backends on a board and
//! against in-memory mocks in tests.

pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod hal;
pub mod link;
pub mod power;
pub mod ready;
pub mod select;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{DebugLevel, LinkConfig};
pub use control::{codes, Command, CommandArg, COMMAND_MAGIC};
pub use error::{Error, Result};
pub use link::{BusHandle, Link, LinkPorts};
pub use power::{DirectPower, PinState, PowerStrategy, SecurePower};
pub use ready::{ReadyBridge, ReadyNotifier};
pub use transfer::{TransferDescriptor, MAX_BUFFER_SIZE};

/// Start-of-frame byte of the link's application-layer framing
pub const FRAME_SOF: u8 = 0xA5;
