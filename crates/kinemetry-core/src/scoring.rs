//! Continuous biomechanical quality scoring from landmark geometry.
//!
//! Four 0-100 scores (posture, balance, symmetry, motion) computed from
//! the current observation and, for motion, the immediately preceding
//! one. All math is two-dimensional in normalized frame coordinates.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::landmark::{Landmark, LandmarkFrame, LandmarkIndex};

/// Detector frame rate assumed when converting per-frame displacement
/// into a velocity for the motion score.
pub const ASSUMED_FRAME_RATE: f64 = 20.0;

/// Lowest landmark index the scorer needs: everything through the knees.
pub const MIN_SCORED_LANDMARKS: usize = LandmarkIndex::RightKnee as usize + 1;

/// The four derived quality scores, each clamped to [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub posture: f64,
    pub balance: f64,
    pub symmetry: f64,
    pub motion: f64,
}

impl ScoreSet {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Per-score deltas against an earlier set, for trend display.
    pub fn trend_against(&self, previous: &ScoreSet) -> ScoreTrend {
        ScoreTrend {
            posture: self.posture - previous.posture,
            balance: self.balance - previous.balance,
            symmetry: self.symmetry - previous.symmetry,
            motion: self.motion - previous.motion,
        }
    }
}

/// Signed score movement since the previous observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTrend {
    pub posture: f64,
    pub balance: f64,
    pub symmetry: f64,
    pub motion: f64,
}

/// Stateful scorer. The only state is the previously computed shoulder
/// velocity, which the motion score differences against; it is owned
/// here (and through here by the session controller) rather than living
/// in process globals, so independent sessions never interfere.
#[derive(Debug, Clone, Default)]
pub struct GeometryScorer {
    last_velocity: f64,
}

impl GeometryScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the velocity baseline. Called at session start and reset.
    pub fn reset(&mut self) {
        self.last_velocity = 0.0;
    }

    /// Score one observation. Frames missing any required landmark
    /// degrade to the all-zero set; this is defined output, not an error.
    pub fn score(&mut self, current: &LandmarkFrame, previous: Option<&LandmarkFrame>) -> ScoreSet {
        if current.len() < MIN_SCORED_LANDMARKS {
            return ScoreSet::zero();
        }

        let left_shoulder = current.get(LandmarkIndex::LeftShoulder).copied().unwrap_or_default();
        let right_shoulder = current.get(LandmarkIndex::RightShoulder).copied().unwrap_or_default();
        let left_hip = current.get(LandmarkIndex::LeftHip).copied().unwrap_or_default();
        let right_hip = current.get(LandmarkIndex::RightHip).copied().unwrap_or_default();
        let left_knee = current.get(LandmarkIndex::LeftKnee).copied().unwrap_or_default();
        let right_knee = current.get(LandmarkIndex::RightKnee).copied().unwrap_or_default();
        let left_elbow = current.get(LandmarkIndex::LeftElbow).copied().unwrap_or_default();
        let right_elbow = current.get(LandmarkIndex::RightElbow).copied().unwrap_or_default();

        let posture = posture_score(&left_shoulder, &right_shoulder, &left_hip, &right_hip);
        let balance = balance_score(&left_hip, &right_hip, &left_knee, &right_knee);
        let symmetry = symmetry_score(
            &left_shoulder,
            &right_shoulder,
            &left_elbow,
            &right_elbow,
            &left_hip,
            &right_hip,
            &left_knee,
            &right_knee,
        );
        let motion = self.motion_score(current, previous);

        ScoreSet { posture, balance, symmetry, motion }
    }

    /// Shoulder-pair displacement scaled to a velocity, differenced
    /// against the previous measurement. One-step variance: this is a
    /// high-variance signal by construction (kept for compatibility with
    /// the established score scale; a smoothing window would change it).
    fn motion_score(&mut self, current: &LandmarkFrame, previous: Option<&LandmarkFrame>) -> f64 {
        let Some(prev) = previous else {
            return 100.0;
        };
        if prev.len() < MIN_SCORED_LANDMARKS {
            return 100.0;
        }

        let ls = current.get(LandmarkIndex::LeftShoulder).copied().unwrap_or_default();
        let rs = current.get(LandmarkIndex::RightShoulder).copied().unwrap_or_default();
        let pls = prev.get(LandmarkIndex::LeftShoulder).copied().unwrap_or_default();
        let prs = prev.get(LandmarkIndex::RightShoulder).copied().unwrap_or_default();

        let dx1 = ls.x - pls.x;
        let dy1 = ls.y - pls.y;
        let dx2 = rs.x - prs.x;
        let dy2 = rs.y - prs.y;
        let velocity =
            (dx1 * dx1 + dy1 * dy1 + dx2 * dx2 + dy2 * dy2).sqrt() * ASSUMED_FRAME_RATE;

        let variance = (velocity - self.last_velocity).abs();
        self.last_velocity = velocity;

        (100.0 - variance * 10.0).max(0.0)
    }
}

/// Angle between the shoulder-pair and hip-pair vectors, in degrees.
///
/// The cosine argument is clamped to [-1, 1] before `acos` so floating
/// point drift cannot push it outside the domain.
fn pair_angle_degrees(shoulder: Vector2<f64>, hip: Vector2<f64>) -> f64 {
    let norms = shoulder.norm() * hip.norm();
    if norms <= 0.0 {
        return 0.0;
    }
    (shoulder.dot(&hip) / norms).clamp(-1.0, 1.0).acos().to_degrees()
}

fn posture_score(ls: &Landmark, rs: &Landmark, lh: &Landmark, rh: &Landmark) -> f64 {
    let shoulder = Vector2::new(rs.x - ls.x, rs.y - ls.y);
    let hip = Vector2::new(rh.x - lh.x, rh.y - lh.y);
    let angle = pair_angle_degrees(shoulder, hip);
    (100.0 - (angle - 180.0).abs()).max(0.0)
}

/// Vertical hip/knee asymmetry, heavily penalized: coordinates are
/// normalized to [0, 1], so the 1000x coefficient makes small tilts
/// visible on the 0-100 scale.
fn balance_score(lh: &Landmark, rh: &Landmark, lk: &Landmark, rk: &Landmark) -> f64 {
    let hip_diff = (lh.y - rh.y).abs();
    let knee_diff = (lk.y - rk.y).abs();
    (100.0 - (hip_diff + knee_diff) * 1000.0).max(0.0)
}

#[allow(clippy::too_many_arguments)]
fn symmetry_score(
    ls: &Landmark,
    rs: &Landmark,
    le: &Landmark,
    re: &Landmark,
    lh: &Landmark,
    rh: &Landmark,
    lk: &Landmark,
    rk: &Landmark,
) -> f64 {
    let left_arm = Vector2::new(ls.x - le.x, ls.y - le.y).norm();
    let right_arm = Vector2::new(rs.x - re.x, rs.y - re.y).norm();
    let left_leg = Vector2::new(lh.x - lk.x, lh.y - lk.y).norm();
    let right_leg = Vector2::new(rh.x - rk.x, rh.y - rk.y).norm();
    let diff = (left_arm - right_arm).abs() + (left_leg - right_leg).abs();
    (100.0 - diff * 500.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::LANDMARK_COUNT;

    /// Upright frame: shoulders level above level hips, equal limb lengths.
    fn upright_frame() -> LandmarkFrame {
        let mut lms = vec![Landmark::new(0.5, 0.5, 0.0, 0.9); LANDMARK_COUNT];
        lms[LandmarkIndex::LeftShoulder as usize] = Landmark::new(0.4, 0.3, 0.0, 0.9);
        lms[LandmarkIndex::RightShoulder as usize] = Landmark::new(0.6, 0.3, 0.0, 0.9);
        lms[LandmarkIndex::LeftElbow as usize] = Landmark::new(0.35, 0.45, 0.0, 0.9);
        lms[LandmarkIndex::RightElbow as usize] = Landmark::new(0.65, 0.45, 0.0, 0.9);
        lms[LandmarkIndex::LeftHip as usize] = Landmark::new(0.45, 0.6, 0.0, 0.9);
        lms[LandmarkIndex::RightHip as usize] = Landmark::new(0.55, 0.6, 0.0, 0.9);
        lms[LandmarkIndex::LeftKnee as usize] = Landmark::new(0.45, 0.8, 0.0, 0.9);
        lms[LandmarkIndex::RightKnee as usize] = Landmark::new(0.55, 0.8, 0.0, 0.9);
        LandmarkFrame::new(lms)
    }

    /// Mirror a frame left-right: swap paired landmarks and reflect x.
    fn mirrored(frame: &LandmarkFrame) -> LandmarkFrame {
        let pairs = [
            (LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder),
            (LandmarkIndex::LeftElbow, LandmarkIndex::RightElbow),
            (LandmarkIndex::LeftHip, LandmarkIndex::RightHip),
            (LandmarkIndex::LeftKnee, LandmarkIndex::RightKnee),
        ];
        let mut lms: Vec<Landmark> = (0..LANDMARK_COUNT)
            .map(|i| {
                let lm = frame.get(LandmarkIndex::from_index(i).unwrap()).copied().unwrap();
                Landmark::new(1.0 - lm.x, lm.y, lm.z, lm.visibility)
            })
            .collect();
        for (l, r) in pairs {
            lms.swap(l as usize, r as usize);
        }
        LandmarkFrame::new(lms)
    }

    #[test]
    fn test_short_frame_scores_zero() {
        let mut scorer = GeometryScorer::new();
        assert_eq!(scorer.score(&LandmarkFrame::default(), None), ScoreSet::zero());

        let short = LandmarkFrame::new(vec![Landmark::new(0.5, 0.5, 0.0, 0.9); 10]);
        assert_eq!(scorer.score(&short, None), ScoreSet::zero());
    }

    #[test]
    fn test_upright_frame_scores_high() {
        let mut scorer = GeometryScorer::new();
        let scores = scorer.score(&upright_frame(), None);
        // Anti-parallel shoulder/hip vectors would give 180deg; here both
        // point rightward so the angle is 0 and posture bottoms out, but
        // balance and symmetry reward the level, even geometry.
        assert!(scores.balance > 99.0);
        assert!(scores.symmetry > 99.0);
        assert_eq!(scores.motion, 100.0);
    }

    #[test]
    fn test_posture_symmetric_under_mirroring() {
        let frame = upright_frame();
        let flipped = mirrored(&frame);
        let mut a = GeometryScorer::new();
        let mut b = GeometryScorer::new();
        let sa = a.score(&frame, None);
        let sb = b.score(&flipped, None);
        assert!((sa.posture - sb.posture).abs() < 1e-9);
        assert!((sa.symmetry - sb.symmetry).abs() < 1e-9);
    }

    #[test]
    fn test_scores_bounded_for_wild_coordinates() {
        let mut lms = vec![Landmark::new(0.0, 0.0, 0.0, 0.9); LANDMARK_COUNT];
        lms[LandmarkIndex::LeftHip as usize] = Landmark::new(12.0, -40.0, 0.0, 0.9);
        lms[LandmarkIndex::RightKnee as usize] = Landmark::new(-7.0, 33.0, 0.0, 0.9);
        let frame = LandmarkFrame::new(lms);

        let mut scorer = GeometryScorer::new();
        let scores = scorer.score(&frame, Some(&frame.clone()));
        for s in [scores.posture, scores.balance, scores.symmetry, scores.motion] {
            assert!((0.0..=100.0).contains(&s), "score out of range: {s}");
        }
    }

    #[test]
    fn test_motion_defaults_without_previous() {
        let mut scorer = GeometryScorer::new();
        let scores = scorer.score(&upright_frame(), None);
        assert_eq!(scores.motion, 100.0);
    }

    #[test]
    fn test_motion_penalizes_velocity_change() {
        let mut scorer = GeometryScorer::new();
        let still = upright_frame();

        // Stationary: velocity 0, matches baseline 0, full score.
        let s1 = scorer.score(&still, Some(&still));
        assert_eq!(s1.motion, 100.0);

        // Sudden shoulder jump: velocity spikes against the 0 baseline.
        let mut moved = still.clone();
        let mut lms: Vec<Landmark> = (0..LANDMARK_COUNT)
            .map(|i| *moved.get(LandmarkIndex::from_index(i).unwrap()).unwrap())
            .collect();
        lms[LandmarkIndex::LeftShoulder as usize].x += 0.2;
        lms[LandmarkIndex::RightShoulder as usize].x += 0.2;
        moved = LandmarkFrame::new(lms);

        let s2 = scorer.score(&moved, Some(&still));
        assert!(s2.motion < 100.0);
    }

    #[test]
    fn test_reset_clears_velocity_baseline() {
        let mut scorer = GeometryScorer::new();
        let frame = upright_frame();
        scorer.score(&frame, Some(&frame));
        scorer.last_velocity = 5.0;
        scorer.reset();
        assert_eq!(scorer.last_velocity, 0.0);
    }

    #[test]
    fn test_trend_deltas() {
        let a = ScoreSet { posture: 80.0, balance: 70.0, symmetry: 60.0, motion: 50.0 };
        let b = ScoreSet { posture: 85.0, balance: 65.0, symmetry: 60.0, motion: 55.0 };
        let trend = b.trend_against(&a);
        assert_eq!(trend.posture, 5.0);
        assert_eq!(trend.balance, -5.0);
        assert_eq!(trend.symmetry, 0.0);
    }
}
