//! Leading-edge rate limiting for display-only updates.

use std::time::{Duration, Instant};

/// A leading-edge rate limiter: the first call in an interval fires,
/// everything else inside the interval is dropped outright (not
/// queued). Only the latest state matters for display surfaces, so
/// losing intermediate updates is acceptable there; this must never
/// gate the sampling path, where every tick is accuracy-critical.
#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    min_interval: Duration,
    last_fired: Option<Instant>,
}

impl UpdateScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last_fired: None }
    }

    /// Whether a call arriving now is allowed through.
    pub fn try_fire(&mut self) -> bool {
        self.fire_at(Instant::now())
    }

    /// Clock-injected variant of [`try_fire`](Self::try_fire).
    pub fn fire_at(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }

    /// Forget the last firing so the next call passes unconditionally.
    pub fn reset(&mut self) {
        self.last_fired = None;
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
