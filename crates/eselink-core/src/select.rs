//! Chip-select sequencing
//!
//! The select line frames each exchange: driven low (active) with a short
//! settle window before bytes move, driven high immediately after. The
//! swing routines toggle the line at microsecond pitch to resynchronize
//! bit framing - the release form runs on session close, the assert form
//! is an explicit control-plane recovery command.

use crate::error::Result;
use crate::link::{Link, LinkInner};
use std::thread;
use std::time::Duration;

/// Settle after asserting select for a control-plane enable
const SELECT_SETTLE: Duration = Duration::from_micros(60);

/// Settle between select assert and the read exchange
pub(crate) const READ_SETTLE: Duration = Duration::from_micros(80);

/// Settle between select assert and the write exchange
pub(crate) const WRITE_SETTLE: Duration = Duration::from_micros(95);

/// Pitch of one swing half-toggle
const SWING_PITCH: Duration = Duration::from_micros(1);

impl LinkInner {
    /// Drive select active (low) and hold through the settle window.
    pub(crate) fn assert_select(&mut self) -> Result<()> {
        self.assert_select_settle(SELECT_SETTLE)
    }

    pub(crate) fn assert_select_settle(&mut self, settle: Duration) -> Result<()> {
        self.select.set(false)?;
        thread::sleep(settle);
        Ok(())
    }

    /// Drive select inactive (high) immediately.
    pub(crate) fn deassert_select(&mut self) -> Result<()> {
        self.select.set(true)
    }

    /// Release-form swing: `count` high/low pulses ending low.
    ///
    /// Run on close to scrub residual bit framing across a close/reopen
    /// cycle.
    pub(crate) fn swing_release(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            thread::sleep(SWING_PITCH);
            self.select.set(true)?;
            thread::sleep(SWING_PITCH);
            self.select.set(false)?;
        }
        if self.config.debug.enabled() {
            log::debug!("release swing: {} pulses", count);
        }
        Ok(())
    }

    /// Assert-form swing: start high, alternate low/high `count` times,
    /// finish by driving low.
    pub(crate) fn swing_assert(&mut self, count: usize) -> Result<()> {
        self.select.set(true)?;
        thread::sleep(SWING_PITCH);
        for _ in 0..count {
            thread::sleep(SWING_PITCH);
            self.select.set(false)?;
            thread::sleep(SWING_PITCH);
            self.select.set(true)?;
        }
        thread::sleep(SWING_PITCH);
        self.select.set(false)?;
        Ok(())
    }
}

impl Link {
    /// Assert the select line (control-plane enable).
    pub fn assert_select(&self) -> Result<()> {
        self.lock_state().assert_select()
    }

    /// De-assert the select line (control-plane disable).
    pub fn deassert_select(&self) -> Result<()> {
        self.lock_state().deassert_select()
    }

    /// Enable the clock gate, then assert select.
    ///
    /// On clock-enable failure select is left untouched and the error
    /// propagates.
    pub fn enable_clock_and_select(&self) -> Result<()> {
        let mut inner = self.lock_state();
        self.enable_clock_locked(&mut inner)?;
        inner.assert_select()
    }

    /// De-assert select, then disable the clock gate.
    ///
    /// A no-op returning success when the clock was never enabled; select
    /// is only touched on the enabled path.
    pub fn disable_select_and_clock(&self) -> Result<()> {
        let mut inner = self.lock_state();
        if !inner.clock_enabled {
            return Ok(());
        }
        inner.deassert_select()?;
        if inner.config.debug.enabled() {
            log::debug!("disabling clock with select");
        }
        self.disable_clock_locked(&mut inner)
    }

    /// Run the assert-form swing with a caller-supplied pulse count.
    pub fn swing_select(&self, count: usize) -> Result<()> {
        let mut inner = self.lock_state();
        let res = inner.swing_assert(count);
        if inner.config.debug.enabled() {
            log::debug!("assert swing: {} pulses", count);
        }
        res
    }
}
