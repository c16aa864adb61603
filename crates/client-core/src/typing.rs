//! Typing-episode signaler.
//!
//! Keystrokes inside one episode collapse into a single start signal; the
//! stop signal fires when the idle window elapses or a send ends the episode
//! early. The caller owns the timer and feeds instants back in.

use std::time::{Duration, Instant};

/// A state edge the caller must forward to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingEdge {
    Start,
    Stop,
}

#[derive(Debug)]
pub struct TypingSignaler {
    idle_window: Duration,
    deadline: Option<Instant>,
    signaling: bool,
}

impl TypingSignaler {
    pub fn new(idle_window: Duration) -> Self {
        Self {
            idle_window,
            deadline: None,
            signaling: false,
        }
    }

    /// Registers composer activity. Emits `Start` only on the idle→typing
    /// edge; every keystroke re-arms the idle deadline.
    pub fn on_keystroke(&mut self, now: Instant) -> Option<TypingEdge> {
        self.deadline = Some(now + self.idle_window);
        if self.signaling {
            None
        } else {
            self.signaling = true;
            Some(TypingEdge::Start)
        }
    }

    /// Called when the armed deadline fires. A wakeup before the (re-armed)
    /// deadline is a no-op.
    pub fn on_deadline(&mut self, now: Instant) -> Option<TypingEdge> {
        match self.deadline {
            Some(at) if now >= at => {
                self.deadline = None;
                self.end_episode()
            }
            _ => None,
        }
    }

    /// A send ends the episode immediately, whatever the deadline says.
    pub fn on_send(&mut self) -> Option<TypingEdge> {
        self.deadline = None;
        self.end_episode()
    }

    /// Next instant the caller should wake us at, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn end_episode(&mut self) -> Option<TypingEdge> {
        if self.signaling {
            self.signaling = false;
            Some(TypingEdge::Stop)
        } else {
            None
        }
    }
}
