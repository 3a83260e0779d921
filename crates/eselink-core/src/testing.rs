//! Shared mock collaborators for the crate's unit tests.

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::hal::{ClockSource, PowerRail, RailProvider, SecureMonitor, SelectLine, SpiBus, WakeHold};
use crate::link::{Link, LinkPorts};
use crate::power::{DirectPower, SecurePower};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct BusProbe {
    pub fill: u8,
    pub speed: u32,
    pub exchanges: Vec<Vec<u8>>,
    pub fail: Option<Error>,
}

pub(crate) struct MockBus {
    probe: Arc<Mutex<BusProbe>>,
}

impl SpiBus for MockBus {
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], _timeout: Duration) -> Result<()> {
        let mut probe = self.probe.lock().unwrap();
        if let Some(e) = probe.fail {
            return Err(e);
        }
        probe.exchanges.push(tx.to_vec());
        rx.fill(probe.fill);
        Ok(())
    }

    fn max_speed(&self) -> u32 {
        self.probe.lock().unwrap().speed
    }

    fn set_max_speed(&mut self, hz: u32) -> Result<()> {
        self.probe.lock().unwrap().speed = hz;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct RailProbe {
    pub enabled: bool,
    pub enables: usize,
    pub disables: usize,
    pub missing: bool,
    pub fail_enable: Option<Error>,
    pub fail_disable: Option<Error>,
}

pub(crate) struct MockRailProvider {
    probe: Arc<Mutex<RailProbe>>,
}

struct MockRail {
    probe: Arc<Mutex<RailProbe>>,
}

impl RailProvider for MockRailProvider {
    fn claim(&mut self, _name: &str) -> Result<Box<dyn PowerRail>> {
        if self.probe.lock().unwrap().missing {
            return Err(Error::DeviceUnavailable);
        }
        Ok(Box::new(MockRail {
            probe: Arc::clone(&self.probe),
        }))
    }
}

impl PowerRail for MockRail {
    fn enable(&mut self, _timeout: Duration) -> Result<()> {
        let mut probe = self.probe.lock().unwrap();
        if let Some(e) = probe.fail_enable {
            return Err(e);
        }
        probe.enabled = true;
        probe.enables += 1;
        Ok(())
    }

    fn disable(&mut self, _timeout: Duration) -> Result<()> {
        let mut probe = self.probe.lock().unwrap();
        if let Some(e) = probe.fail_disable {
            return Err(e);
        }
        probe.enabled = false;
        probe.disables += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct ClockProbe {
    pub raises: usize,
    pub lowers: usize,
    pub rates: Vec<u32>,
    pub fail_raise: Option<Error>,
    pub fail_lower: Option<Error>,
}

pub(crate) struct MockClock {
    probe: Arc<Mutex<ClockProbe>>,
}

impl ClockSource for MockClock {
    fn raise(&mut self, _timeout: Duration) -> Result<()> {
        let mut probe = self.probe.lock().unwrap();
        if let Some(e) = probe.fail_raise {
            return Err(e);
        }
        probe.raises += 1;
        Ok(())
    }

    fn lower(&mut self, _timeout: Duration) -> Result<()> {
        let mut probe = self.probe.lock().unwrap();
        if let Some(e) = probe.fail_lower {
            return Err(e);
        }
        probe.lowers += 1;
        Ok(())
    }

    fn set_rate(&mut self, hz: u32) -> Result<()> {
        self.probe.lock().unwrap().rates.push(hz);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct SelectProbe {
    pub levels: Vec<bool>,
    pub fail: Option<Error>,
}

pub(crate) struct MockSelect {
    probe: Arc<Mutex<SelectProbe>>,
}

impl SelectLine for MockSelect {
    fn set(&mut self, high: bool) -> Result<()> {
        let mut probe = self.probe.lock().unwrap();
        if let Some(e) = probe.fail {
            return Err(e);
        }
        probe.levels.push(high);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct WakeProbe {
    pub held: bool,
    pub acquires: usize,
}

pub(crate) struct MockWake {
    probe: Arc<Mutex<WakeProbe>>,
}

impl WakeHold for MockWake {
    fn acquire(&mut self) {
        let mut probe = self.probe.lock().unwrap();
        probe.held = true;
        probe.acquires += 1;
    }

    fn release(&mut self) {
        self.probe.lock().unwrap().held = false;
    }

    fn is_held(&self) -> bool {
        self.probe.lock().unwrap().held
    }
}

#[derive(Debug, Default)]
pub(crate) struct MonitorProbe {
    pub resumes: usize,
    pub suspends: usize,
}

pub(crate) struct MockMonitor {
    probe: Arc<Mutex<MonitorProbe>>,
}

impl SecureMonitor for MockMonitor {
    fn resume(&mut self) -> Result<()> {
        self.probe.lock().unwrap().resumes += 1;
        Ok(())
    }

    fn suspend(&mut self) -> Result<()> {
        self.probe.lock().unwrap().suspends += 1;
        Ok(())
    }
}

/// Handles into the mock hardware for assertions.
pub(crate) struct Probes {
    pub bus: Arc<Mutex<BusProbe>>,
    pub rail: Arc<Mutex<RailProbe>>,
    pub clock: Arc<Mutex<ClockProbe>>,
    pub select: Arc<Mutex<SelectProbe>>,
    pub wake: Arc<Mutex<WakeProbe>>,
    pub monitor: Arc<Mutex<MonitorProbe>>,
}

fn build(secure: bool) -> (Link, Probes) {
    let probes = Probes {
        bus: Arc::new(Mutex::new(BusProbe {
            speed: 1_000_000,
            ..Default::default()
        })),
        rail: Arc::new(Mutex::new(RailProbe::default())),
        clock: Arc::new(Mutex::new(ClockProbe::default())),
        select: Arc::new(Mutex::new(SelectProbe::default())),
        wake: Arc::new(Mutex::new(WakeProbe::default())),
        monitor: Arc::new(Mutex::new(MonitorProbe::default())),
    };

    let strategy: Box<dyn crate::power::PowerStrategy> = if secure {
        Box::new(SecurePower::new(Box::new(MockMonitor {
            probe: Arc::clone(&probes.monitor),
        })))
    } else {
        Box::new(DirectPower)
    };

    let ports = LinkPorts {
        bus: Box::new(MockBus {
            probe: Arc::clone(&probes.bus),
        }),
        select: Box::new(MockSelect {
            probe: Arc::clone(&probes.select),
        }),
        rails: Box::new(MockRailProvider {
            probe: Arc::clone(&probes.rail),
        }),
        clock: Box::new(MockClock {
            probe: Arc::clone(&probes.clock),
        }),
        wake: Some(Box::new(MockWake {
            probe: Arc::clone(&probes.wake),
        })),
        strategy,
    };

    let config = LinkConfig::default()
        .with_ready_timeout(Duration::from_millis(50))
        .with_transfer_timeout(Duration::from_millis(200));
    (Link::new(ports, config), probes)
}

/// A link wired to mock hardware with the direct power strategy.
pub(crate) fn link() -> (Link, Probes) {
    build(false)
}

/// A link wired to mock hardware with the secure power strategy.
pub(crate) fn secure_link() -> (Link, Probes) {
    build(true)
}
