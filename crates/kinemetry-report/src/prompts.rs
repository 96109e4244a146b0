//! Prompt construction for the narrative backend.

use crate::assembler::Report;

/// How many samples are inlined into the prompt as an excerpt.
pub const PROMPT_SAMPLE_EXCERPT: usize = 5;

/// Build the movement-analysis prompt from report metadata, a small
/// sample excerpt, and the feature schema description.
pub fn build_report_prompt(report: &Report) -> String {
    let excerpt = report
        .samples
        .iter()
        .take(PROMPT_SAMPLE_EXCERPT)
        .collect::<Vec<_>>();
    let excerpt_json =
        serde_json::to_string_pretty(&excerpt).unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are an expert in human movement analysis and biomechanics.\n\
         Analyze the following pose detection data from a user's physical \
         activity session (33 body landmarks per sample).\n\n\
         Data Summary:\n\
         - Duration: {duration} seconds\n\
         - Total Frames: {total_frames}\n\
         - Timestamp: {timestamp}\n\n\
         Sample Frame Structure (first {excerpt_len} of {total_frames} frames \
         as example; analyze all implicitly):\n{excerpt_json}\n\n\
         Key Features Across Frames (computed from landmarks):\n\
         - Landmarks: 33 body points (nose, shoulders, hips, knees, ...) with \
         x,y,z coordinates and visibility scores.\n\
         - Extracted Metrics: shoulder_pitch (degrees), torso_tilt (degrees), \
         joint_velocity (units/s), step_symmetry (difference), quality_score \
         (% visible landmarks).\n\n\
         Generate a comprehensive, professional movement report. Structure:\n\
         1. **Summary**: overview of the session.\n\
         2. **Key Metrics**: averages for posture, balance, symmetry, motion.\n\
         3. **Insights**: patterns, referencing specific data.\n\
         4. **Recommendations**: personalized tips; flag risks.\n\
         5. **Overall Score**: 0-100% efficiency rating.\n\n\
         Be engaging and actionable. Base the analysis strictly on the data.",
        duration = report.metadata.duration_secs,
        total_frames = report.metadata.total_frames,
        timestamp = report.metadata.timestamp.to_rfc3339(),
        excerpt_len = excerpt.len(),
        excerpt_json = excerpt_json,
    )
}
