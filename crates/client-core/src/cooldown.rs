//! Send-rate gate: at most one outbound attempt per cooldown window.

use std::time::{Duration, Instant};

/// Single-flight send gate.
///
/// The gate never queues anything; a refused attempt is simply dropped by
/// the caller. Time is injected so the arming logic stays testable.
#[derive(Debug)]
pub struct SendCooldown {
    window: Duration,
    armed_until: Option<Instant>,
}

impl SendCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed_until: None,
        }
    }

    /// Arms the window unless it is already hot. Returns whether the caller
    /// may proceed with this send.
    pub fn try_begin(&mut self, now: Instant) -> bool {
        if self.is_active(now) {
            return false;
        }
        self.armed_until = Some(now + self.window);
        true
    }

    /// Whether the gate is currently refusing sends.
    pub fn is_active(&self, now: Instant) -> bool {
        self.armed_until.is_some_and(|until| now < until)
    }

    /// End of the armed window, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.armed_until
    }

    /// Drops an elapsed window so the deadline stops scheduling wakeups.
    pub fn disarm(&mut self) {
        self.armed_until = None;
    }
}
