//! Link lifecycle
//!
//! One [`Link`] is the in-memory state for one attached secure-element
//! chip. A single instance mutex serializes every control-plane command and
//! every direct read/write, so concurrent callers are linearized in arrival
//! order into the lock. A second, finer lock guards only the act of
//! resolving the bus-handle reference, so the instance lock is never held
//! across a resolution that could itself block.
//!
//! Sessions run `Closed -> Open -> Closed`. Opening sequences the rail,
//! settle delay, select line and board pin mux in a fixed order and rolls
//! the rail back on any later failure. Closing is best-effort: every
//! teardown step runs regardless of what failed before it, so the chip is
//! never left half-powered because one step misbehaved.

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::hal::{ClockSource, RailProvider, SelectLine, SpiBus, WakeHold};
use crate::power::{PinState, PowerStrategy};
use crate::ready::{ReadyBridge, ReadyNotifier};
use crate::select::{READ_SETTLE, WRITE_SETTLE};
use crate::transfer::{exchange_bounded, TransferDescriptor, MAX_BUFFER_SIZE};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Rail settle window after power-on before the pins are touched
const POWER_ON_SETTLE: Duration = Duration::from_micros(5000);

/// Short settle between pin park and the select-low park on close
const CLOSE_PARK_SETTLE: Duration = Duration::from_micros(2);

/// Release-form swing pulses run on close against bit-shift artifacts
/// carried into a subsequent open
const CLOSE_SWING_PULSES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Session {
    Closed,
    Open,
}

/// Shared handle on the raw bus primitive.
///
/// The boxed bus lives behind its own lock so a resolved handle can be
/// used for an exchange without holding the resolution lock.
pub struct BusHandle {
    bus: Mutex<Box<dyn SpiBus>>,
}

impl BusHandle {
    pub fn new(bus: Box<dyn SpiBus>) -> Arc<Self> {
        Arc::new(Self {
            bus: Mutex::new(bus),
        })
    }

    pub(crate) fn exchange(&self, tx: &[u8], rx: &mut [u8], timeout: Duration) -> Result<()> {
        self.lock().exchange(tx, rx, timeout)
    }

    pub(crate) fn max_speed(&self) -> u32 {
        self.lock().max_speed()
    }

    pub(crate) fn set_max_speed(&self, hz: u32) -> Result<()> {
        self.lock().set_max_speed(hz)
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn SpiBus>> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Collaborator ports wired in at construction time.
pub struct LinkPorts {
    pub bus: Box<dyn SpiBus>,
    pub select: Box<dyn SelectLine>,
    pub rails: Box<dyn RailProvider>,
    pub clock: Box<dyn ClockSource>,
    pub wake: Option<Box<dyn WakeHold>>,
    pub strategy: Box<dyn PowerStrategy>,
}

/// Mutable per-instance state, guarded by the instance mutex.
pub(crate) struct LinkInner {
    pub(crate) session: Session,
    pub(crate) clock_enabled: bool,
    /// Reserved for secure-mode pin bookkeeping
    #[allow(dead_code)]
    pub(crate) gpio_configured: bool,
    pub(crate) poll_mode: bool,
    pub(crate) select: Box<dyn SelectLine>,
    pub(crate) rails: Box<dyn RailProvider>,
    pub(crate) clock: Box<dyn ClockSource>,
    pub(crate) wake: Option<Box<dyn WakeHold>>,
    pub(crate) strategy: Box<dyn PowerStrategy>,
    pub(crate) config: LinkConfig,
}

impl LinkInner {
    /// Release the wake hold if one is wired and currently held.
    pub(crate) fn release_wake_hold(&mut self) {
        if let Some(wake) = self.wake.as_mut() {
            if wake.is_held() {
                wake.release();
            }
        }
    }
}

/// The in-memory state for one attached secure-element chip.
pub struct Link {
    state: Mutex<LinkInner>,
    bus: Mutex<Option<Arc<BusHandle>>>,
    ready: ReadyBridge,
}

impl Link {
    pub fn new(ports: LinkPorts, config: LinkConfig) -> Self {
        Self {
            state: Mutex::new(LinkInner {
                session: Session::Closed,
                clock_enabled: false,
                gpio_configured: false,
                // Poll-read mode by default; interrupt mode is opted into
                // through the control plane.
                poll_mode: true,
                select: ports.select,
                rails: ports.rails,
                clock: ports.clock,
                wake: ports.wake,
                strategy: ports.strategy,
                config,
            }),
            bus: Mutex::new(Some(BusHandle::new(ports.bus))),
            ready: ReadyBridge::new(),
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, LinkInner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve the bus handle under the bus lock.
    ///
    /// Short critical section: clone the shared handle and release the
    /// lock; the exchange itself runs on the clone.
    pub(crate) fn resolve_bus(&self) -> Result<Arc<BusHandle>> {
        let slot = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(handle) => Ok(Arc::clone(handle)),
            None => {
                log::error!("failed to get bus handle");
                Err(Error::DeviceUnavailable)
            }
        }
    }

    /// Drop the bus handle, as on deregistration. Subsequent operations
    /// needing the bus fail with `DeviceUnavailable`.
    pub fn detach_bus(&self) {
        let mut slot = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// Hand out the interrupt-side end of the readiness bridge.
    pub fn ready_notifier(&self) -> ReadyNotifier {
        self.ready.notifier()
    }

    /// Re-enable the readiness edge source after a consumed signal.
    pub fn arm_ready(&self) {
        self.ready.arm();
    }

    pub fn is_open(&self) -> bool {
        self.lock_state().session == Session::Open
    }

    pub fn clock_enabled(&self) -> bool {
        self.lock_state().clock_enabled
    }

    pub fn poll_mode(&self) -> bool {
        self.lock_state().poll_mode
    }

    /// Currently configured bus target speed.
    pub fn max_speed(&self) -> Result<u32> {
        Ok(self.resolve_bus()?.max_speed())
    }

    /// Open a logical session.
    ///
    /// Fixed order: rail on, settle, select de-asserted, pins routed for
    /// use. A failure after rail-on disables the rail best-effort and
    /// propagates the first error - the rail is never left up on a failed
    /// open.
    pub fn open(&self) -> Result<()> {
        let mut inner = self.lock_state();
        if inner.session == Session::Open {
            log::error!("link already opened");
            return Err(Error::Busy);
        }

        inner.set_power(true)?;
        std::thread::sleep(POWER_ON_SETTLE);

        if let Err(e) = Self::open_pin_state(&mut inner) {
            if let Err(off) = inner.set_power(false) {
                log::error!("rail rollback after failed open also failed: {}", off);
            }
            return Err(e);
        }

        inner.session = Session::Open;
        if inner.config.debug.enabled() {
            log::debug!("link opened");
        }
        Ok(())
    }

    fn open_pin_state(inner: &mut LinkInner) -> Result<()> {
        // Keep select de-asserted until a transfer frames it.
        inner.select.set(true)?;
        inner.strategy.configure_pins(PinState::Default)
    }

    /// Close the logical session.
    ///
    /// Every step runs regardless of earlier failures, which are logged:
    /// clock off, wake hold released, pins parked, select driven low, rail
    /// off, then the release-form swing to scrub residual bit framing.
    pub fn close(&self) {
        let mut inner = self.lock_state();

        if inner.clock_enabled {
            if inner.config.debug.enabled() {
                log::debug!("disabling clock at close");
            }
            if let Err(e) = self.disable_clock_locked(&mut inner) {
                log::error!("failed to disable clock at close: {}", e);
            }
        }

        inner.release_wake_hold();

        if let Err(e) = inner.strategy.configure_pins(PinState::PowerOff) {
            log::error!("failed to park pins at close: {}", e);
        }
        std::thread::sleep(CLOSE_PARK_SETTLE);

        if let Err(e) = inner.select.set(false) {
            log::error!("failed to park select at close: {}", e);
        }

        if let Err(e) = inner.set_power(false) {
            log::error!("failed to turn off rail at close: {}", e);
        }

        if let Err(e) = inner.swing_release(CLOSE_SWING_PULSES) {
            log::error!("release swing at close failed: {}", e);
        }

        inner.session = Session::Closed;
        if inner.config.debug.enabled() {
            log::debug!("link closed");
        }
    }

    /// Read one select-framed exchange into `buf`.
    ///
    /// The count is clamped to [`MAX_BUFFER_SIZE`]. In interrupt mode the
    /// call first waits for the chip's readiness signal. Select is restored
    /// to de-asserted on every exit path.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.lock_state();
        if !inner.strategy.direct_io() {
            return Err(Error::Unsupported);
        }
        let count = buf.len().min(MAX_BUFFER_SIZE);
        if inner.config.debug.enabled() {
            log::debug!("read: {} bytes", count);
        }

        if !inner.poll_mode {
            self.ready.wait(inner.config.ready_timeout)?;
        }

        let bus = self.resolve_bus()?;
        inner.assert_select_settle(READ_SETTLE)?;
        let mut desc = TransferDescriptor {
            tx: None,
            rx: Some(&mut buf[..count]),
            len: count,
        };
        let res = exchange_bounded(&bus, &mut desc, inner.config.transfer_timeout);
        if let Err(e) = inner.deassert_select() {
            log::error!("failed to restore select after read: {}", e);
        }
        res
    }

    /// Write one select-framed exchange from `buf`.
    ///
    /// The count is clamped to [`MAX_BUFFER_SIZE`]; the response bytes are
    /// discarded. Select is restored to de-asserted on every exit path.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut inner = self.lock_state();
        if !inner.strategy.direct_io() {
            return Err(Error::Unsupported);
        }
        let count = buf.len().min(MAX_BUFFER_SIZE);
        if inner.config.debug.enabled() {
            log::debug!("write: {} bytes", count);
        }

        let bus = self.resolve_bus()?;
        inner.assert_select_settle(WRITE_SETTLE)?;
        let mut desc = TransferDescriptor {
            tx: Some(&buf[..count]),
            rx: None,
            len: count,
        };
        let res = exchange_bounded(&bus, &mut desc, inner.config.transfer_timeout);
        if let Err(e) = inner.deassert_select() {
            log::error!("failed to restore select after write: {}", e);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Probes};

    fn open_link() -> (Link, Probes) {
        let (link, probes) = testing::link();
        link.open().unwrap();
        (link, probes)
    }

    #[test]
    fn open_powers_rail_and_parks_select_high() {
        let (link, probes) = testing::link();
        link.open().unwrap();
        assert!(link.is_open());
        assert!(probes.rail.lock().unwrap().enabled);
        assert_eq!(probes.select.lock().unwrap().levels.last(), Some(&true));
    }

    #[test]
    fn second_open_is_busy() {
        let (link, _probes) = open_link();
        assert_eq!(link.open(), Err(Error::Busy));
        assert!(link.is_open());
    }

    #[test]
    fn open_after_close_succeeds() {
        let (link, _probes) = open_link();
        link.close();
        assert!(!link.is_open());
        link.open().unwrap();
        assert!(link.is_open());
    }

    #[test]
    fn failed_open_rolls_back_rail() {
        let (link, probes) = testing::link();
        probes.select.lock().unwrap().fail = Some(Error::Hardware(-19));
        assert_eq!(link.open(), Err(Error::Hardware(-19)));
        assert!(!link.is_open());
        let rail = probes.rail.lock().unwrap();
        assert!(!rail.enabled);
        assert_eq!(rail.enables, 1);
        assert_eq!(rail.disables, 1);
    }

    #[test]
    fn open_without_rail_fails_unavailable() {
        let (link, probes) = testing::link();
        probes.rail.lock().unwrap().missing = true;
        assert_eq!(link.open(), Err(Error::DeviceUnavailable));
        assert!(!link.is_open());
    }

    #[test]
    fn close_tears_down_in_order_despite_failures() {
        let (link, probes) = open_link();
        link.enable_clock().unwrap();
        // Make the rail-off step fail; teardown must still run to the end.
        probes.rail.lock().unwrap().fail_disable = Some(Error::Hardware(-5));
        link.close();

        assert!(!link.is_open());
        assert!(!link.clock_enabled());
        let clock = probes.clock.lock().unwrap();
        assert_eq!(clock.lowers, 1);
        let select = probes.select.lock().unwrap();
        // Select parked low, then the 7-pulse release swing ends low.
        assert_eq!(select.levels.last(), Some(&false));
        assert!(!probes.wake.lock().unwrap().held);
    }

    #[test]
    fn close_swings_select_seven_pulses() {
        let (link, probes) = open_link();
        let before = probes.select.lock().unwrap().levels.len();
        link.close();
        let select = probes.select.lock().unwrap();
        // park-low + 7 * (high, low)
        assert_eq!(select.levels.len() - before, 1 + 2 * CLOSE_SWING_PULSES);
    }

    #[test]
    fn read_and_write_frame_with_select() {
        let (link, probes) = open_link();
        probes.bus.lock().unwrap().fill = 0x3C;

        let n = link.write(&[0xA5; 16]).unwrap();
        assert_eq!(n, 16);
        let mut buf = [0u8; 16];
        let n = link.read(&mut buf).unwrap();
        assert_eq!(n, 16);
        assert_eq!(buf, [0x3C; 16]);

        let select = probes.select.lock().unwrap();
        // Each framed op: assert low then restore high.
        let framing: Vec<bool> = select.levels.iter().rev().take(4).rev().copied().collect();
        assert_eq!(framing, vec![false, true, false, true]);

        let bus = probes.bus.lock().unwrap();
        assert_eq!(bus.exchanges.len(), 2);
        assert_eq!(bus.exchanges[0], vec![0xA5; 16]);
    }

    #[test]
    fn oversized_read_write_counts_clamp() {
        let (link, probes) = open_link();
        let big = [0u8; MAX_BUFFER_SIZE + 40];
        assert_eq!(link.write(&big).unwrap(), MAX_BUFFER_SIZE);
        let mut buf = [0u8; MAX_BUFFER_SIZE + 40];
        assert_eq!(link.read(&mut buf).unwrap(), MAX_BUFFER_SIZE);
        let bus = probes.bus.lock().unwrap();
        assert!(bus.exchanges.iter().all(|x| x.len() == MAX_BUFFER_SIZE));
    }

    #[test]
    fn read_failure_still_restores_select() {
        let (link, probes) = open_link();
        probes.bus.lock().unwrap().fail = Some(Error::Hardware(-5));
        let mut buf = [0u8; 8];
        assert_eq!(link.read(&mut buf), Err(Error::Hardware(-5)));
        assert_eq!(probes.select.lock().unwrap().levels.last(), Some(&true));
    }

    #[test]
    fn detached_bus_fails_io_unavailable() {
        let (link, _probes) = open_link();
        link.detach_bus();
        let mut buf = [0u8; 4];
        assert_eq!(link.read(&mut buf), Err(Error::DeviceUnavailable));
        assert_eq!(link.write(&buf), Err(Error::DeviceUnavailable));
    }

    #[test]
    fn interrupt_mode_read_waits_for_ready() {
        let (link, probes) = open_link();
        link.set_poll_mode(false);
        probes.bus.lock().unwrap().fill = 0x11;

        // No signal posted: the read times out without touching the bus.
        let mut buf = [0u8; 4];
        assert_eq!(link.read(&mut buf), Err(Error::Timeout));
        assert!(probes.bus.lock().unwrap().exchanges.is_empty());

        link.ready_notifier().signal();
        assert_eq!(link.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [0x11; 4]);
    }

    #[test]
    fn secure_strategy_rejects_direct_io() {
        let (link, _probes) = testing::secure_link();
        link.open().unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(link.read(&mut buf), Err(Error::Unsupported));
        assert_eq!(link.write(&buf), Err(Error::Unsupported));
    }
}
