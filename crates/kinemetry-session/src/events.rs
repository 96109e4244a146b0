//! Session event stream exposed to report consumers and UI layers.

use serde::Serialize;

use kinemetry_core::{ScoreSet, SessionId};
use kinemetry_report::Report;

/// Everything observable about a running session, broadcast to any
/// number of subscribers.
#[derive(Debug, Clone, Serialize)]
pub enum SessionEvent {
    Started {
        session_id: SessionId,
        total_samples: usize,
    },
    /// Throttled live scores from the continuous landmark stream.
    ScoresUpdated(ScoreSet),
    SampleAppended {
        second: u32,
        slot: u32,
    },
    /// Throttled buffer-fill progress.
    Progress {
        collected: usize,
        total: usize,
    },
    /// No pose seen for the loss window. Recoverable; fires once per
    /// outage.
    PoseLost,
    PoseRegained,
    Finalizing,
    Complete(Report),
    Stopped,
}
