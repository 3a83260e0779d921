//! Clock gate
//!
//! Enable/disable of the bus clock source feeding the link, with
//! multi-open defence and a paired wake hold while the clock is up. The
//! source is always programmed to twice the bus target speed - a sampling
//! requirement of this link.

use crate::error::{Error, Result};
use crate::link::{Link, LinkInner};

/// Lowest clock rate the control plane accepts, in Hz
pub const MIN_CLOCK_HZ: u32 = 100_000;

impl Link {
    /// Enable the bus clock.
    ///
    /// Rejected with `AlreadyEnabled` while the gate is up. Raising the
    /// clock descends into the power-management layer and may block up to
    /// the configured deadline.
    pub fn enable_clock(&self) -> Result<()> {
        let mut inner = self.lock_state();
        self.enable_clock_locked(&mut inner)
    }

    pub(crate) fn enable_clock_locked(&self, inner: &mut LinkInner) -> Result<()> {
        if inner.clock_enabled {
            log::error!("clock was already enabled");
            return Err(Error::AlreadyEnabled);
        }

        let bus = self.resolve_bus()?;
        let timeout = inner.config.clock_timeout;
        inner.strategy.raise_clock(inner.clock.as_mut(), timeout)?;
        inner.clock.set_rate(bus.max_speed().saturating_mul(2))?;

        if let Some(wake) = inner.wake.as_mut() {
            if !wake.is_held() {
                wake.acquire();
            }
        }
        inner.clock_enabled = true;
        Ok(())
    }

    /// Disable the bus clock.
    ///
    /// Rejected with `NotEnabled` when the gate is down. The wake hold is
    /// released on every exit path, including a failed bus resolution.
    pub fn disable_clock(&self) -> Result<()> {
        let mut inner = self.lock_state();
        self.disable_clock_locked(&mut inner)
    }

    pub(crate) fn disable_clock_locked(&self, inner: &mut LinkInner) -> Result<()> {
        if !inner.clock_enabled {
            log::error!("clock was not enabled");
            return Err(Error::NotEnabled);
        }

        let res = match self.resolve_bus() {
            Ok(_bus) => {
                inner.clock_enabled = false;
                let timeout = inner.config.clock_timeout;
                inner.strategy.lower_clock(inner.clock.as_mut(), timeout)
            }
            Err(e) => Err(e),
        };

        inner.release_wake_hold();
        res
    }

    /// Reprogram the bus clock rate.
    ///
    /// Rates below [`MIN_CLOCK_HZ`] are rejected before anything is
    /// touched; accepted rates are recorded on the bus handle and the
    /// source programmed to twice the rate.
    pub fn set_clock_rate(&self, hz: u32) -> Result<()> {
        let mut inner = self.lock_state();
        self.set_clock_rate_locked(&mut inner, hz)
    }

    pub(crate) fn set_clock_rate_locked(&self, inner: &mut LinkInner, hz: u32) -> Result<()> {
        if hz < MIN_CLOCK_HZ {
            return Err(Error::InvalidArgument);
        }
        if inner.config.debug.enabled() {
            log::debug!("clock rate: {} Hz", hz);
        }

        let bus = self.resolve_bus()?;
        bus.set_max_speed(hz)?;
        inner.clock.set_rate(hz.saturating_mul(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn enable_programs_double_speed_and_holds_wake() {
        let (link, probes) = testing::link();
        link.enable_clock().unwrap();
        assert!(link.clock_enabled());
        let clock = probes.clock.lock().unwrap();
        assert_eq!(clock.raises, 1);
        // Mock bus starts at 1 MHz.
        assert_eq!(clock.rates, vec![2_000_000]);
        assert!(probes.wake.lock().unwrap().held);
    }

    #[test]
    fn double_enable_is_rejected_without_side_effects() {
        let (link, probes) = testing::link();
        link.enable_clock().unwrap();
        assert_eq!(link.enable_clock(), Err(Error::AlreadyEnabled));
        assert!(link.clock_enabled());
        assert_eq!(probes.clock.lock().unwrap().raises, 1);
    }

    #[test]
    fn disable_without_enable_touches_nothing() {
        let (link, probes) = testing::link();
        assert_eq!(link.disable_clock(), Err(Error::NotEnabled));
        let clock = probes.clock.lock().unwrap();
        assert_eq!(clock.raises, 0);
        assert_eq!(clock.lowers, 0);
    }

    #[test]
    fn enable_then_disable_round_trip() {
        let (link, probes) = testing::link();
        link.enable_clock().unwrap();
        link.disable_clock().unwrap();
        assert!(!link.clock_enabled());
        let clock = probes.clock.lock().unwrap();
        assert_eq!(clock.lowers, 1);
        assert!(!probes.wake.lock().unwrap().held);
    }

    #[test]
    fn disable_with_detached_bus_still_releases_wake() {
        let (link, probes) = testing::link();
        link.enable_clock().unwrap();
        assert!(probes.wake.lock().unwrap().held);
        link.detach_bus();
        assert_eq!(link.disable_clock(), Err(Error::DeviceUnavailable));
        assert!(!probes.wake.lock().unwrap().held);
    }

    #[test]
    fn enable_with_detached_bus_is_unavailable() {
        let (link, probes) = testing::link();
        link.detach_bus();
        assert_eq!(link.enable_clock(), Err(Error::DeviceUnavailable));
        assert!(!link.clock_enabled());
        assert_eq!(probes.clock.lock().unwrap().raises, 0);
    }

    #[test]
    fn raise_timeout_propagates_and_leaves_gate_down() {
        let (link, probes) = testing::link();
        probes.clock.lock().unwrap().fail_raise = Some(Error::Timeout);
        assert_eq!(link.enable_clock(), Err(Error::Timeout));
        assert!(!link.clock_enabled());
        assert!(!probes.wake.lock().unwrap().held);
    }

    #[test]
    fn rate_floor_is_enforced() {
        let (link, probes) = testing::link();
        assert_eq!(link.set_clock_rate(50_000), Err(Error::InvalidArgument));
        assert_eq!(link.set_clock_rate(99_999), Err(Error::InvalidArgument));
        assert!(probes.clock.lock().unwrap().rates.is_empty());
    }

    #[test]
    fn accepted_rate_programs_exactly_double() {
        let (link, probes) = testing::link();
        link.set_clock_rate(100_000).unwrap();
        link.set_clock_rate(1_000_000).unwrap();
        link.set_clock_rate(6_500_000).unwrap();
        assert_eq!(
            probes.clock.lock().unwrap().rates,
            vec![200_000, 2_000_000, 13_000_000]
        );
        assert_eq!(link.max_speed().unwrap(), 6_500_000);
    }

    #[test]
    fn secure_strategy_brackets_clock_with_monitor() {
        let (link, probes) = testing::secure_link();
        link.enable_clock().unwrap();
        link.disable_clock().unwrap();
        let monitor = probes.monitor.lock().unwrap();
        assert_eq!(monitor.resumes, 1);
        assert_eq!(monitor.suspends, 1);
    }
}
