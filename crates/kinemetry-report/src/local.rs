//! Deterministic local narrative, used when the external backend is
//! unavailable.

use kinemetry_core::Sample;

use crate::assembler::Report;

/// Per-feature averages over the buffered samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureAverages {
    /// Mean absolute shoulder pitch, degrees.
    pub pitch: f64,
    /// Mean absolute torso tilt, degrees.
    pub tilt: f64,
    /// Mean landmark quality, percent.
    pub quality: f64,
    /// Mean joint velocity, units/s.
    pub velocity: f64,
    /// Mean step-symmetry drift.
    pub symmetry: f64,
}

impl FeatureAverages {
    pub fn from_samples(samples: &[Sample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as f64;
        let mut acc = Self::default();
        for sample in samples {
            let f = &sample.features;
            acc.pitch += f.shoulder_pitch.abs();
            acc.tilt += f.torso_tilt.abs();
            acc.quality += f.quality_score;
            acc.velocity += f.joint_velocity;
            acc.symmetry += f.step_symmetry;
        }
        Self {
            pitch: acc.pitch / n,
            tilt: acc.tilt / n,
            quality: acc.quality / n,
            velocity: acc.velocity / n,
            symmetry: acc.symmetry / n,
        }
    }
}

/// Render the fallback report from buffered samples.
///
/// Category scores derive from the feature averages: posture from the
/// mean pitch deviation, balance and symmetry from landmark quality,
/// motion tracks posture. Threshold remarks fire at posture>85,
/// balance>80, symmetry>75, motion>80.
pub fn local_report(report: &Report) -> String {
    if report.samples.is_empty() {
        return "No analysis data available. Run an analysis first.".to_string();
    }

    let avg = FeatureAverages::from_samples(&report.samples);
    let posture_score = (100.0 - avg.pitch).clamp(0.0, 100.0);
    let balance_score = avg.quality.clamp(0.0, 100.0);
    let symmetry_score = avg.quality.clamp(0.0, 100.0);
    let motion_score = posture_score;
    let efficiency = (posture_score + balance_score + symmetry_score + motion_score) / 4.0;

    let posture_remark = if posture_score > 85.0 {
        "Excellent posture alignment. Continue maintaining a straight torso."
    } else {
        "Improve posture: align shoulders directly over hips to reduce strain."
    };
    let balance_remark = if balance_score > 80.0 {
        "Strong balance detected. Weight distribution is effective."
    } else {
        "Enhance balance: distribute weight evenly between feet to prevent sway."
    };
    let symmetry_remark = if symmetry_score > 75.0 {
        "Good symmetry in movements. Low risk of overuse injuries."
    } else {
        "Focus on symmetry: ensure left and right limbs move equally."
    };
    let motion_remark = if motion_score > 80.0 {
        "Smooth, efficient motion. Great biomechanics."
    } else {
        "Refine motion: slow down jerky movements for better control."
    };

    format!(
        "Movement Analysis Report\n\
         ========================\n\n\
         Analysis Summary\n\
         ----------------\n\
         - Duration: {duration} seconds\n\
         - Total frames analyzed: {frames}\n\
         - Timestamp: {timestamp}\n\n\
         Key Performance Metrics\n\
         -----------------------\n\
         - posture score: {posture:.0}% (mean shoulder pitch deviation {pitch:.0} degrees)\n\
         - balance score: {balance:.0}% (landmark stability)\n\
         - symmetry score: {symmetry:.0}% (mean step drift {sym_drift:.2})\n\
         - motion score: {motion:.0}% (mean joint velocity {velocity:.1} units/s)\n\
         - landmark quality: {quality:.0}% visible\n\
         - mean torso tilt: {tilt:.0} degrees\n\
         - overall action efficiency: {efficiency:.0}%\n\n\
         Recommendations\n\
         ---------------\n\
         - {posture_remark}\n\
         - {balance_remark}\n\
         - {symmetry_remark}\n\
         - {motion_remark}\n\n\
         Technical Notes\n\
         ---------------\n\
         - 33-landmark pose schema, visibility threshold 0.4.\n\
         - For professional assessment, consult a certified trainer or physiotherapist.",
        duration = report.metadata.duration_secs,
        frames = report.metadata.total_frames,
        timestamp = report.metadata.timestamp.format("%Y-%m-%d %H:%M:%S"),
        posture = posture_score,
        pitch = avg.pitch,
        balance = balance_score,
        symmetry = symmetry_score,
        sym_drift = avg.symmetry,
        motion = motion_score,
        velocity = avg.velocity,
        quality = avg.quality,
        tilt = avg.tilt,
        efficiency = efficiency,
        posture_remark = posture_remark,
        balance_remark = balance_remark,
        symmetry_remark = symmetry_remark,
        motion_remark = motion_remark,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use kinemetry_core::{FeatureSet, SessionConfig, SessionId};
    use std::collections::BTreeMap;

    fn sample_with(features: FeatureSet, second: u32, slot: u32) -> Sample {
        Sample { second, slot, landmarks: BTreeMap::new(), features }
    }

    fn good_features() -> FeatureSet {
        FeatureSet {
            shoulder_pitch: 4.0,
            torso_tilt: 2.0,
            joint_velocity: 0.5,
            step_symmetry: 0.02,
            quality_score: 95.0,
        }
    }

    #[test]
    fn test_averages() {
        let samples = vec![
            sample_with(FeatureSet { shoulder_pitch: -10.0, quality_score: 80.0, ..Default::default() }, 1, 1),
            sample_with(FeatureSet { shoulder_pitch: 20.0, quality_score: 60.0, ..Default::default() }, 1, 2),
        ];
        let avg = FeatureAverages::from_samples(&samples);
        assert_eq!(avg.pitch, 15.0); // absolute values
        assert_eq!(avg.quality, 70.0);
    }

    #[test]
    fn test_report_contains_all_categories() {
        let samples = vec![sample_with(good_features(), 1, 1), sample_with(good_features(), 1, 2)];
        let report = assemble(SessionId::new(), samples, &SessionConfig::new(5, 2));
        let text = local_report(&report);

        for category in ["posture", "balance", "symmetry", "motion", "quality"] {
            assert!(text.contains(category), "missing category: {category}");
        }
        assert!(text.contains("Duration: 5 seconds"));
        assert!(text.contains("Total frames analyzed: 2"));
    }

    #[test]
    fn test_good_session_positive_remarks() {
        let samples = vec![sample_with(good_features(), 1, 1)];
        let report = assemble(SessionId::new(), samples, &SessionConfig::default());
        let text = local_report(&report);
        assert!(text.contains("Excellent posture alignment"));
        assert!(text.contains("Strong balance detected"));
    }

    #[test]
    fn test_poor_session_improvement_remarks() {
        let poor = FeatureSet {
            shoulder_pitch: 40.0,
            torso_tilt: 25.0,
            joint_velocity: 6.0,
            step_symmetry: 0.4,
            quality_score: 50.0,
        };
        let samples = vec![sample_with(poor, 1, 1)];
        let report = assemble(SessionId::new(), samples, &SessionConfig::default());
        let text = local_report(&report);
        assert!(text.contains("Improve posture"));
        assert!(text.contains("Enhance balance"));
        assert!(text.contains("Focus on symmetry"));
    }

    #[test]
    fn test_empty_buffer_fixed_message() {
        let report = assemble(SessionId::new(), Vec::new(), &SessionConfig::default());
        assert_eq!(local_report(&report), "No analysis data available. Run an analysis first.");
    }
}
