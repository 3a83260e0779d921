//! Link configuration
//!
//! The debug verbosity knob, the rail name and the blocking-call deadlines
//! are carried per instance so links stay independently testable - no
//! process-wide knobs.

use std::time::Duration;

/// Default rail name looked up through the rail provider
pub const DEFAULT_RAIL_NAME: &str = "vdd-ese";

/// Driver debug verbosity, settable at runtime through the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugLevel {
    Off,
    #[default]
    Full,
}

impl DebugLevel {
    /// Whether chatty per-operation logging is on
    pub fn enabled(self) -> bool {
        matches!(self, DebugLevel::Full)
    }

    /// Decode a control-plane argument (0 = off, nonzero = full)
    pub fn from_raw(raw: u64) -> Self {
        if raw == 0 {
            DebugLevel::Off
        } else {
            DebugLevel::Full
        }
    }
}

/// Per-instance configuration for a [`Link`](crate::link::Link)
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Name of the voltage rail claimed for power sequencing
    pub rail_name: String,
    /// Debug verbosity
    pub debug: DebugLevel,
    /// Deadline for rail enable/disable
    pub power_timeout: Duration,
    /// Deadline for clock raise/lower
    pub clock_timeout: Duration,
    /// Deadline for one bus exchange
    pub transfer_timeout: Duration,
    /// Deadline a reader waits on the interrupt bridge in interrupt mode
    pub ready_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            rail_name: DEFAULT_RAIL_NAME.to_string(),
            debug: DebugLevel::default(),
            power_timeout: Duration::from_millis(500),
            clock_timeout: Duration::from_millis(500),
            transfer_timeout: Duration::from_secs(1),
            ready_timeout: Duration::from_secs(1),
        }
    }
}

impl LinkConfig {
    /// Create a configuration for the given rail name
    pub fn new(rail_name: impl Into<String>) -> Self {
        Self {
            rail_name: rail_name.into(),
            ..Default::default()
        }
    }

    /// Set the debug verbosity
    pub fn with_debug(mut self, debug: DebugLevel) -> Self {
        self.debug = debug;
        self
    }

    /// Set the deadline for one bus exchange
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Set the deadline a reader waits for the readiness signal
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }
}
