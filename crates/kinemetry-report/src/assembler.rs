//! Report payload assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kinemetry_core::{Sample, SessionConfig, SessionId};

use crate::narrative::Narrative;

/// Session-level metadata attached to every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: u32,
    /// Number of samples actually collected (may be below the target
    /// when the session was stopped early or poses were missing).
    pub total_frames: usize,
}

/// The finalization payload: metadata plus the ordered sample set, with
/// the narrative attached once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub samples: Vec<Sample>,
    pub narrative: Option<Narrative>,
}

impl Report {
    pub fn with_narrative(mut self, narrative: Narrative) -> Self {
        self.narrative = Some(narrative);
        self
    }

    /// Whether the report fell back to the local template.
    pub fn is_degraded(&self) -> bool {
        matches!(self.narrative, Some(Narrative::Local(_)))
    }
}

/// Build the report payload from a buffer snapshot. Pure and total:
/// an empty snapshot produces a valid empty report.
pub fn assemble(session_id: SessionId, samples: Vec<Sample>, config: &SessionConfig) -> Report {
    Report {
        metadata: ReportMetadata {
            session_id,
            timestamp: Utc::now(),
            duration_secs: config.duration_secs,
            total_frames: samples.len(),
        },
        samples,
        narrative: None,
    }
}
