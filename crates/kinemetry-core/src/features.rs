//! Per-sample derived features.
//!
//! Evaluated once per accepted sample at the sampling cadence, not once
//! per raw detector frame.

use serde::{Deserialize, Serialize};

use crate::landmark::{LandmarkFrame, LandmarkIndex, LANDMARK_COUNT};

/// Lowest landmark index feature extraction needs: both hips.
pub const MIN_FEATURE_LANDMARKS: usize = LandmarkIndex::RightHip as usize + 1;

/// Derived quantities attached to each buffered sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Shoulder-pair inclination, degrees.
    pub shoulder_pitch: f64,
    /// Hip-pair inclination, degrees.
    pub torso_tilt: f64,
    /// Left-shoulder displacement since the previous observation scaled
    /// by the sampling rate, normalized units per second.
    pub joint_velocity: f64,
    /// Absolute change of the hip-x-difference since the previous
    /// observation, a proxy for gait symmetry drift.
    pub step_symmetry: f64,
    /// Fraction of the 33 landmarks above the visibility threshold, x100.
    pub quality_score: f64,
}

/// Extract features from one observation and the previous one.
///
/// Frames shorter than [`MIN_FEATURE_LANDMARKS`] degrade to a default
/// set carrying only the visibility quality score.
pub fn extract_features(
    current: &LandmarkFrame,
    previous: Option<&LandmarkFrame>,
    sampling_rate_hz: u32,
) -> FeatureSet {
    let quality_score = current.visible_count() as f64 / LANDMARK_COUNT as f64 * 100.0;

    if current.len() < MIN_FEATURE_LANDMARKS {
        return FeatureSet { quality_score, ..FeatureSet::default() };
    }

    let ls = current.get(LandmarkIndex::LeftShoulder).copied().unwrap_or_default();
    let rs = current.get(LandmarkIndex::RightShoulder).copied().unwrap_or_default();
    let lh = current.get(LandmarkIndex::LeftHip).copied().unwrap_or_default();
    let rh = current.get(LandmarkIndex::RightHip).copied().unwrap_or_default();

    let shoulder_pitch = (rs.y - ls.y).atan2(rs.x - ls.x).to_degrees();
    let torso_tilt = (rh.y - lh.y).atan2(rh.x - lh.x).to_degrees();

    let usable_previous = previous.filter(|p| p.len() >= MIN_FEATURE_LANDMARKS);

    let joint_velocity = match usable_previous {
        Some(prev) => {
            let pls = prev.get(LandmarkIndex::LeftShoulder).copied().unwrap_or_default();
            let dx = ls.x - pls.x;
            let dy = ls.y - pls.y;
            (dx * dx + dy * dy).sqrt() * sampling_rate_hz as f64
        }
        None => 0.0,
    };

    let previous_hip_diff = match usable_previous {
        Some(prev) => {
            let plh = prev.get(LandmarkIndex::LeftHip).copied().unwrap_or_default();
            let prh = prev.get(LandmarkIndex::RightHip).copied().unwrap_or_default();
            plh.x - prh.x
        }
        None => 0.0,
    };
    let step_symmetry = ((lh.x - rh.x) - previous_hip_diff).abs();

    FeatureSet {
        shoulder_pitch,
        torso_tilt,
        joint_velocity,
        step_symmetry,
        quality_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;

    fn frame_with(shoulders: [(f64, f64); 2], hips: [(f64, f64); 2]) -> LandmarkFrame {
        let mut lms = vec![Landmark::new(0.5, 0.5, 0.0, 0.9); LANDMARK_COUNT];
        lms[LandmarkIndex::LeftShoulder as usize] =
            Landmark::new(shoulders[0].0, shoulders[0].1, 0.0, 0.9);
        lms[LandmarkIndex::RightShoulder as usize] =
            Landmark::new(shoulders[1].0, shoulders[1].1, 0.0, 0.9);
        lms[LandmarkIndex::LeftHip as usize] = Landmark::new(hips[0].0, hips[0].1, 0.0, 0.9);
        lms[LandmarkIndex::RightHip as usize] = Landmark::new(hips[1].0, hips[1].1, 0.0, 0.9);
        LandmarkFrame::new(lms)
    }

    #[test]
    fn test_level_shoulders_zero_pitch() {
        let frame = frame_with([(0.4, 0.3), (0.6, 0.3)], [(0.45, 0.6), (0.55, 0.6)]);
        let features = extract_features(&frame, None, 2);
        assert!(features.shoulder_pitch.abs() < 1e-9);
        assert!(features.torso_tilt.abs() < 1e-9);
    }

    #[test]
    fn test_tilted_shoulders_pitch_degrees() {
        // Right shoulder one unit right and one unit down: 45 degrees.
        let frame = frame_with([(0.4, 0.3), (0.5, 0.4)], [(0.45, 0.6), (0.55, 0.6)]);
        let features = extract_features(&frame, None, 2);
        assert!((features.shoulder_pitch - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_zero_without_previous() {
        let frame = frame_with([(0.4, 0.3), (0.6, 0.3)], [(0.45, 0.6), (0.55, 0.6)]);
        let features = extract_features(&frame, None, 2);
        assert_eq!(features.joint_velocity, 0.0);
        // No previous hip baseline: symmetry is the raw hip-x-difference.
        assert!((features.step_symmetry - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_scales_with_rate() {
        let prev = frame_with([(0.4, 0.3), (0.6, 0.3)], [(0.45, 0.6), (0.55, 0.6)]);
        let curr = frame_with([(0.5, 0.3), (0.6, 0.3)], [(0.45, 0.6), (0.55, 0.6)]);
        let at2 = extract_features(&curr, Some(&prev), 2);
        let at4 = extract_features(&curr, Some(&prev), 4);
        assert!((at2.joint_velocity - 0.2).abs() < 1e-9);
        assert!((at4.joint_velocity - 2.0 * at2.joint_velocity).abs() < 1e-9);
    }

    #[test]
    fn test_step_symmetry_tracks_hip_drift() {
        let prev = frame_with([(0.4, 0.3), (0.6, 0.3)], [(0.45, 0.6), (0.55, 0.6)]);
        let curr = frame_with([(0.4, 0.3), (0.6, 0.3)], [(0.42, 0.6), (0.55, 0.6)]);
        let features = extract_features(&curr, Some(&prev), 2);
        // |(0.42-0.55) - (0.45-0.55)| = 0.03
        assert!((features.step_symmetry - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_quality_is_visible_fraction() {
        let mut lms = vec![Landmark::new(0.5, 0.5, 0.0, 0.9); LANDMARK_COUNT];
        for lm in lms.iter_mut().skip(25) {
            lm.visibility = 0.1;
        }
        let frame = LandmarkFrame::new(lms);
        let features = extract_features(&frame, None, 2);
        assert!((features.quality_score - 25.0 / 33.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_frame_keeps_quality_only() {
        let frame = LandmarkFrame::new(vec![Landmark::new(0.5, 0.5, 0.0, 0.9); 10]);
        let features = extract_features(&frame, None, 2);
        assert_eq!(features.shoulder_pitch, 0.0);
        assert_eq!(features.joint_velocity, 0.0);
        assert!((features.quality_score - 10.0 / 33.0 * 100.0).abs() < 1e-9);
    }
}
