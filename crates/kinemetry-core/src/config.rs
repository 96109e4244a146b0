//! Session configuration and identity.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Longest session a start command will accept, seconds.
pub const MAX_SESSION_DURATION_SECS: u32 = 300;

/// Highest supported sampling cadence, Hz.
pub const MAX_SAMPLING_RATE_HZ: u32 = 30;

/// Unique identifier for one timed analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters of one timed analysis run.
///
/// The sampling rate is integral because it doubles as the per-second
/// slot count: slot indices roll over to the next second after exactly
/// `sampling_rate_hz` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub duration_secs: u32,
    pub sampling_rate_hz: u32,
}

impl SessionConfig {
    pub fn new(duration_secs: u32, sampling_rate_hz: u32) -> Self {
        Self { duration_secs, sampling_rate_hz }
    }

    /// Reject configurations a session cannot run with. Failures here
    /// keep the session Idle.
    pub fn validate(&self) -> Result<()> {
        if self.duration_secs == 0 || self.duration_secs > MAX_SESSION_DURATION_SECS {
            return Err(Error::Config(format!(
                "duration must be 1..={MAX_SESSION_DURATION_SECS} seconds, got {}",
                self.duration_secs
            )));
        }
        if self.sampling_rate_hz == 0 || self.sampling_rate_hz > MAX_SAMPLING_RATE_HZ {
            return Err(Error::Config(format!(
                "sampling rate must be 1..={MAX_SAMPLING_RATE_HZ} Hz, got {}",
                self.sampling_rate_hz
            )));
        }
        Ok(())
    }

    /// Samples this session will collect given a buffer capacity.
    pub fn total_samples(&self, capacity: usize) -> usize {
        ((self.duration_secs * self.sampling_rate_hz) as usize).min(capacity)
    }

    /// Whether the configured duration x rate exceeds the buffer and
    /// the session will truncate.
    pub fn is_truncated(&self, capacity: usize) -> bool {
        (self.duration_secs * self.sampling_rate_hz) as usize > capacity
    }

    /// Interval between sampling clock ticks.
    pub fn sample_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sampling_rate_hz as f64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { duration_secs: 5, sampling_rate_hz: 2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_samples_min_resolution() {
        let capacity = 100;
        assert_eq!(SessionConfig::new(5, 2).total_samples(capacity), 10);
        assert_eq!(SessionConfig::new(60, 2).total_samples(capacity), 100);
        assert!(SessionConfig::new(60, 2).is_truncated(capacity));
        assert!(!SessionConfig::new(5, 2).is_truncated(capacity));
    }

    #[test]
    fn test_validation_bounds() {
        assert!(SessionConfig::new(5, 2).validate().is_ok());
        assert!(SessionConfig::new(0, 2).validate().is_err());
        assert!(SessionConfig::new(5, 0).validate().is_err());
        assert!(SessionConfig::new(301, 2).validate().is_err());
        assert!(SessionConfig::new(5, 31).validate().is_err());
    }

    #[test]
    fn test_sample_period() {
        assert_eq!(SessionConfig::new(5, 2).sample_period(), Duration::from_millis(500));
        assert_eq!(SessionConfig::new(5, 4).sample_period(), Duration::from_millis(250));
    }
}
