//! Interrupt bridge
//!
//! The chip raises an edge-triggered line when it has data for the host.
//! The handler side runs on a foreign execution context, so it never takes
//! the instance lock and never performs transfers: it only posts "ready"
//! and disables its own source. All state consumption happens on the reader
//! side.

use crate::error::{Error, Result};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct State {
    /// Whether the edge source is enabled. Cleared by the notifier on
    /// firing; only `arm` sets it again (no auto re-enable).
    armed: bool,
    /// A readiness signal was posted and not yet consumed.
    pending: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

/// Reader-side end of the interrupt bridge, owned by the link.
#[derive(Debug)]
pub struct ReadyBridge {
    shared: Arc<Shared>,
}

/// Interrupt-side end: cloneable, posts readiness from the edge handler.
#[derive(Debug, Clone)]
pub struct ReadyNotifier {
    shared: Arc<Shared>,
}

impl ReadyBridge {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    armed: true,
                    pending: false,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    /// Hand out a notifier for the interrupt context.
    pub fn notifier(&self) -> ReadyNotifier {
        ReadyNotifier {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Re-enable the edge source after a consumed signal.
    pub fn arm(&self) {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .armed
    }

    /// Block until a readiness signal is posted or the deadline passes.
    pub fn wait(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !state.pending {
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout);
            }
            let (guard, res) = self
                .shared
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            if res.timed_out() && !state.pending {
                return Err(Error::Timeout);
            }
        }
        state.pending = false;
        Ok(())
    }
}

impl Default for ReadyBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyNotifier {
    /// Post a readiness signal.
    ///
    /// Fires only while the source is armed and disarms it in the same
    /// step (edge-triggered, no auto re-enable). Returns whether the
    /// signal was accepted.
    pub fn signal(&self) -> bool {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !state.armed {
            return false;
        }
        state.armed = false;
        state.pending = true;
        self.shared.cond.notify_all();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_then_wait() {
        let bridge = ReadyBridge::new();
        let notifier = bridge.notifier();
        assert!(notifier.signal());
        assert!(bridge.wait(Duration::from_millis(10)).is_ok());
    }

    #[test]
    fn signal_disarms_itself() {
        let bridge = ReadyBridge::new();
        let notifier = bridge.notifier();
        assert!(notifier.signal());
        // Second edge without re-arm is dropped.
        assert!(!notifier.signal());
        assert!(bridge.wait(Duration::from_millis(10)).is_ok());
        assert_eq!(bridge.wait(Duration::from_millis(5)), Err(Error::Timeout));

        bridge.arm();
        assert!(notifier.signal());
        assert!(bridge.wait(Duration::from_millis(10)).is_ok());
    }

    #[test]
    fn wait_times_out_without_signal() {
        let bridge = ReadyBridge::new();
        assert_eq!(bridge.wait(Duration::from_millis(5)), Err(Error::Timeout));
    }

    #[test]
    fn wakes_blocked_waiter() {
        let bridge = ReadyBridge::new();
        let notifier = bridge.notifier();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            notifier.signal()
        });
        assert!(bridge.wait(Duration::from_secs(2)).is_ok());
        assert!(handle.join().unwrap());
    }
}
