//! Analyzer configuration.

use serde::{Deserialize, Serialize};

use kinemetry_core::{SessionConfig, DEFAULT_SAMPLE_CAPACITY};
use kinemetry_report::NarrativeConfig;

/// Detector frames without a pose before a loss is signalled
/// (roughly three seconds at the assumed detector rate).
pub const DEFAULT_POSE_LOSS_FRAMES: u32 = 90;

/// Complete analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Default session parameters when a start command omits them.
    pub session: SessionConfig,

    /// Sample buffer capacity per session.
    pub buffer_capacity: usize,

    /// Minimum interval between ScoresUpdated events, milliseconds.
    pub score_interval_ms: u64,

    /// Minimum interval between Progress events, milliseconds.
    pub progress_interval_ms: u64,

    /// Consecutive no-pose stream updates before PoseLost fires.
    pub pose_loss_frames: u32,

    /// Narrative backend settings.
    pub narrative: NarrativeConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            buffer_capacity: DEFAULT_SAMPLE_CAPACITY,
            score_interval_ms: 100,
            progress_interval_ms: 100,
            pose_loss_frames: DEFAULT_POSE_LOSS_FRAMES,
            narrative: NarrativeConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a file, with `KINEMETRY_*` environment
    /// variables overriding file values.
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("KINEMETRY"))
            .build()?;

        settings.try_deserialize()
    }

    /// Load from environment variables only.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("KINEMETRY"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.buffer_capacity, 100);
        assert_eq!(config.pose_loss_frames, 90);
        assert_eq!(config.session.duration_secs, 5);
        assert_eq!(config.session.sampling_rate_hz, 2);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = AnalyzerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AnalyzerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.buffer_capacity, config.buffer_capacity);
        assert_eq!(back.narrative.model, config.narrative.model);
    }
}
