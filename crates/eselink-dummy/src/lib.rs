//! eselink-dummy - In-memory mock hardware for testing
//!
//! This crate provides a dummy hardware set that emulates the secure
//! element's surroundings in memory: the exchange bus, the switched rail,
//! the clock layer, the select line, the wake hold and the secure-world
//! monitor. It's useful for testing and development without a board, and
//! it records everything it is asked to do so tests can assert on the
//! exact sequencing.

use eselink_core::error::{Error, Result};
use eselink_core::hal::{
    ClockSource, PowerRail, RailProvider, SecureMonitor, SelectLine, SpiBus, WakeHold,
};
use eselink_core::{DirectPower, LinkPorts, SecurePower};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Configuration for the dummy hardware
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Initial bus target speed in Hz
    pub speed_hz: u32,
    /// Byte the chip answers with when no canned response is queued
    pub fill: u8,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            speed_hz: 1_000_000,
            fill: 0x00,
        }
    }
}

/// Recorded state of the emulated hardware, shared by all ports.
#[derive(Debug, Default)]
pub struct HardwareState {
    // Bus
    pub speed_hz: u32,
    pub fill: u8,
    /// Every tx buffer clocked out, in order
    pub exchanges: Vec<Vec<u8>>,
    /// Canned responses consumed front-first; `fill` afterwards
    pub responses: VecDeque<Vec<u8>>,
    /// Simulated duration of one exchange; exceeding the caller's
    /// deadline yields `Timeout`
    pub exchange_delay: Option<Duration>,
    pub fail_exchange: Option<Error>,

    // Rail
    pub rail_enabled: bool,
    pub rail_enables: usize,
    pub rail_disables: usize,
    /// Pretend the named rail cannot be resolved
    pub rail_missing: bool,
    pub fail_rail_enable: Option<Error>,
    pub fail_rail_disable: Option<Error>,

    // Clock layer
    pub clock_raises: usize,
    pub clock_lowers: usize,
    pub clock_rates: Vec<u32>,
    pub fail_clock_raise: Option<Error>,

    // Select line
    pub select_levels: Vec<bool>,
    pub fail_select: Option<Error>,

    // Wake hold
    pub wake_held: bool,
    pub wake_acquires: usize,

    // Secure monitor
    pub monitor_resumes: usize,
    pub monitor_suspends: usize,
}

type Shared = Arc<Mutex<HardwareState>>;

fn lock(shared: &Shared) -> std::sync::MutexGuard<'_, HardwareState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Factory for one emulated hardware set.
///
/// All ports handed out share one [`HardwareState`]; keep a clone of the
/// factory around to inspect or fault-inject through [`state`](Self::state).
#[derive(Clone)]
pub struct DummyHardware {
    shared: Shared,
}

impl DummyHardware {
    pub fn new(config: DummyConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(HardwareState {
                speed_hz: config.speed_hz,
                fill: config.fill,
                ..Default::default()
            })),
        }
    }

    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Shared recorded state, for assertions and fault injection.
    pub fn state(&self) -> Shared {
        Arc::clone(&self.shared)
    }

    /// Queue a canned response for the next exchange.
    pub fn push_response(&self, bytes: impl Into<Vec<u8>>) {
        lock(&self.shared).responses.push_back(bytes.into());
    }

    pub fn bus(&self) -> Box<dyn SpiBus> {
        Box::new(DummyBus {
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn select_line(&self) -> Box<dyn SelectLine> {
        Box::new(DummySelect {
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn rail_provider(&self) -> Box<dyn RailProvider> {
        Box::new(DummyRailProvider {
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn clock_source(&self) -> Box<dyn ClockSource> {
        Box::new(DummyClock {
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn wake_hold(&self) -> Box<dyn WakeHold> {
        Box::new(DummyWake {
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn secure_monitor(&self) -> Box<dyn SecureMonitor> {
        Box::new(DummyMonitor {
            shared: Arc::clone(&self.shared),
        })
    }

    /// A complete port set with the direct power strategy.
    pub fn ports(&self) -> LinkPorts {
        LinkPorts {
            bus: self.bus(),
            select: self.select_line(),
            rails: self.rail_provider(),
            clock: self.clock_source(),
            wake: Some(self.wake_hold()),
            strategy: Box::new(DirectPower),
        }
    }

    /// A complete port set with the secure power strategy.
    pub fn secure_ports(&self) -> LinkPorts {
        LinkPorts {
            strategy: Box::new(SecurePower::new(self.secure_monitor())),
            ..self.ports()
        }
    }
}

struct DummyBus {
    shared: Shared,
}

impl SpiBus for DummyBus {
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], timeout: Duration) -> Result<()> {
        let mut state = lock(&self.shared);
        if let Some(e) = state.fail_exchange {
            return Err(e);
        }
        if let Some(delay) = state.exchange_delay {
            if delay > timeout {
                return Err(Error::Timeout);
            }
        }
        state.exchanges.push(tx.to_vec());
        match state.responses.pop_front() {
            Some(canned) => {
                let n = canned.len().min(rx.len());
                rx[..n].copy_from_slice(&canned[..n]);
                let fill = state.fill;
                rx[n..].fill(fill);
            }
            None => {
                let fill = state.fill;
                rx.fill(fill);
            }
        }
        Ok(())
    }

    fn max_speed(&self) -> u32 {
        lock(&self.shared).speed_hz
    }

    fn set_max_speed(&mut self, hz: u32) -> Result<()> {
        lock(&self.shared).speed_hz = hz;
        Ok(())
    }
}

struct DummySelect {
    shared: Shared,
}

impl SelectLine for DummySelect {
    fn set(&mut self, high: bool) -> Result<()> {
        let mut state = lock(&self.shared);
        if let Some(e) = state.fail_select {
            return Err(e);
        }
        state.select_levels.push(high);
        Ok(())
    }
}

struct DummyRailProvider {
    shared: Shared,
}

struct DummyRail {
    shared: Shared,
}

impl RailProvider for DummyRailProvider {
    fn claim(&mut self, name: &str) -> Result<Box<dyn PowerRail>> {
        if lock(&self.shared).rail_missing {
            log::error!("dummy: rail {} not resolvable", name);
            return Err(Error::DeviceUnavailable);
        }
        Ok(Box::new(DummyRail {
            shared: Arc::clone(&self.shared),
        }))
    }
}

impl PowerRail for DummyRail {
    fn enable(&mut self, _timeout: Duration) -> Result<()> {
        let mut state = lock(&self.shared);
        if let Some(e) = state.fail_rail_enable {
            return Err(e);
        }
        state.rail_enabled = true;
        state.rail_enables += 1;
        Ok(())
    }

    fn disable(&mut self, _timeout: Duration) -> Result<()> {
        let mut state = lock(&self.shared);
        if let Some(e) = state.fail_rail_disable {
            return Err(e);
        }
        state.rail_enabled = false;
        state.rail_disables += 1;
        Ok(())
    }
}

struct DummyClock {
    shared: Shared,
}

impl ClockSource for DummyClock {
    fn raise(&mut self, _timeout: Duration) -> Result<()> {
        let mut state = lock(&self.shared);
        if let Some(e) = state.fail_clock_raise {
            return Err(e);
        }
        state.clock_raises += 1;
        Ok(())
    }

    fn lower(&mut self, _timeout: Duration) -> Result<()> {
        lock(&self.shared).clock_lowers += 1;
        Ok(())
    }

    fn set_rate(&mut self, hz: u32) -> Result<()> {
        lock(&self.shared).clock_rates.push(hz);
        Ok(())
    }
}

struct DummyWake {
    shared: Shared,
}

impl WakeHold for DummyWake {
    fn acquire(&mut self) {
        let mut state = lock(&self.shared);
        state.wake_held = true;
        state.wake_acquires += 1;
    }

    fn release(&mut self) {
        lock(&self.shared).wake_held = false;
    }

    fn is_held(&self) -> bool {
        lock(&self.shared).wake_held
    }
}

struct DummyMonitor {
    shared: Shared,
}

impl SecureMonitor for DummyMonitor {
    fn resume(&mut self) -> Result<()> {
        lock(&self.shared).monitor_resumes += 1;
        Ok(())
    }

    fn suspend(&mut self) -> Result<()> {
        lock(&self.shared).monitor_suspends += 1;
        Ok(())
    }
}
