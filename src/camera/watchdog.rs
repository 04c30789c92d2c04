//! Heartbeat watchdog deadline
//!
//! A single rearmable deadline. Every heartbeat pushes it one window into
//! the future, so it only expires when the accessory has been silent for a
//! full window.

use std::time::Duration;

use tokio::time::Instant;

/// Rearmable deadline owned by the session event loop.
#[derive(Debug)]
pub(crate) struct Watchdog {
    window: Duration,
    deadline: Instant,
}

impl Watchdog {
    /// Create a watchdog whose first deadline is one window from now.
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: Instant::now() + window,
        }
    }

    /// Cancel the scheduled expiry and arm a new one, one window from now.
    pub(crate) fn reset(&mut self) {
        self.deadline = Instant::now() + self.window;
    }

    /// The instant at which the watchdog expires unless reset first.
    pub(crate) fn deadline(&self) -> Instant {
        self.deadline
    }
}
