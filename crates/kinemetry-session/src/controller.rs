//! The analysis session state machine.
//!
//! One `RwLock`-guarded state struct serializes the two writers feeding
//! a session: the landmark stream (arriving at the detector's native
//! cadence) and the sampling clock (a spawned task ticking at the
//! configured rate). An epoch counter, bumped on every start/stop/reset,
//! invalidates stale tasks so a finished narrative call can never
//! resurrect a session the user already stopped.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use kinemetry_core::{
    extract_features, Error, GeometryScorer, LandmarkFrame, Result, Sample, SampleBuffer,
    ScoreSet, ScoreTrend, SessionConfig, SessionId,
};
use kinemetry_report::{assemble, narrate, NarrativeBackend, Report};

use crate::config::AnalyzerConfig;
use crate::events::SessionEvent;
use crate::scheduler::UpdateScheduler;

/// Fewest landmarks an observation needs before a tick will sample it.
const MIN_SAMPLE_LANDMARKS: usize = 4;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Active,
    Finalizing,
}

/// All mutable session state, guarded by one lock so a sampling tick
/// and a stream update never interleave mid-write.
struct SessionState {
    phase: Phase,
    epoch: u64,
    session_id: SessionId,
    config: SessionConfig,
    buffer: SampleBuffer,
    scorer: GeometryScorer,
    latest: Option<LandmarkFrame>,
    previous: Option<LandmarkFrame>,
    latest_scores: ScoreSet,
    previous_scores: ScoreSet,
    second: u32,
    slot: u32,
    frames_without_pose: u32,
    pose_lost: bool,
    pose_loss_frames: u32,
    score_gate: UpdateScheduler,
    progress_gate: UpdateScheduler,
}

impl SessionState {
    fn new(analyzer: &AnalyzerConfig) -> Self {
        Self {
            phase: Phase::Idle,
            epoch: 0,
            session_id: SessionId::new(),
            config: analyzer.session,
            buffer: SampleBuffer::new(analyzer.buffer_capacity),
            scorer: GeometryScorer::new(),
            latest: None,
            previous: None,
            latest_scores: ScoreSet::zero(),
            previous_scores: ScoreSet::zero(),
            second: 1,
            slot: 0,
            frames_without_pose: 0,
            pose_lost: false,
            pose_loss_frames: analyzer.pose_loss_frames,
            score_gate: UpdateScheduler::new(Duration::from_millis(analyzer.score_interval_ms)),
            progress_gate: UpdateScheduler::new(Duration::from_millis(
                analyzer.progress_interval_ms,
            )),
        }
    }

    /// Reset everything a new run must not inherit.
    fn begin_run(&mut self, config: SessionConfig) {
        self.epoch += 1;
        self.phase = Phase::Active;
        self.session_id = SessionId::new();
        self.config = config;
        self.buffer.clear();
        self.scorer.reset();
        self.latest = None;
        self.previous = None;
        self.second = 1;
        self.slot = 0;
        self.frames_without_pose = 0;
        self.pose_lost = false;
        self.score_gate.reset();
        self.progress_gate.reset();
    }

    /// One sampling-clock tick. Returns true when the session has
    /// reached its sample target and should finalize.
    fn sample_tick(&mut self, events: &broadcast::Sender<SessionEvent>) -> bool {
        let total = self.config.total_samples(self.buffer.capacity());
        if self.buffer.len() >= total {
            return true;
        }

        let Some(frame) = self.latest.clone() else {
            return false;
        };
        if frame.len() < MIN_SAMPLE_LANDMARKS {
            return false;
        }

        self.slot += 1;
        let features = extract_features(&frame, self.previous.as_ref(), self.config.sampling_rate_hz);
        let sample = Sample::from_frame(self.second, self.slot, &frame, features);

        if self.buffer.append(sample) {
            let _ = events.send(SessionEvent::SampleAppended {
                second: self.second,
                slot: self.slot,
            });
            tracing::debug!(
                second = self.second,
                slot = self.slot,
                collected = self.buffer.len(),
                total,
                "sample appended"
            );
            if self.progress_gate.try_fire() {
                let _ = events.send(SessionEvent::Progress {
                    collected: self.buffer.len(),
                    total,
                });
            }
        }

        if self.slot >= self.config.sampling_rate_hz {
            self.second += 1;
            self.slot = 0;
        }

        false
    }
}

/// Drives one timed analysis run at a time: start/stop/reset commands,
/// the landmark stream, the sampling clock, and finalization into a
/// [`Report`].
pub struct SessionController {
    inner: Arc<RwLock<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    backend: Arc<dyn NarrativeBackend>,
    narrative_timeout: Duration,
}

impl SessionController {
    pub fn new(analyzer: AnalyzerConfig, backend: Arc<dyn NarrativeBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(RwLock::new(SessionState::new(&analyzer))),
            events,
            backend,
            narrative_timeout: Duration::from_millis(analyzer.narrative.timeout_ms),
        }
    }

    /// Subscribe to the session event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn phase(&self) -> Phase {
        self.inner.read().await.phase
    }

    /// Latest continuous scores from the landmark stream.
    pub async fn latest_scores(&self) -> ScoreSet {
        self.inner.read().await.latest_scores
    }

    /// Score movement since the previous stream observation.
    pub async fn score_trend(&self) -> ScoreTrend {
        let state = self.inner.read().await;
        state.latest_scores.trend_against(&state.previous_scores)
    }

    /// Read-only copy of the collected samples. Valid in any phase;
    /// after a stop the frozen buffer remains readable until reset.
    pub async fn snapshot(&self) -> Vec<Sample> {
        self.inner.read().await.buffer.snapshot()
    }

    /// Begin a timed analysis run. Rejected unless the session is Idle.
    pub async fn start(&self, config: SessionConfig) -> Result<SessionId> {
        config.validate()?;

        let (session_id, epoch, total) = {
            let mut state = self.inner.write().await;
            if state.phase != Phase::Idle {
                return Err(Error::Session(format!(
                    "cannot start while session is {:?}",
                    state.phase
                )));
            }
            if config.is_truncated(state.buffer.capacity()) {
                tracing::warn!(
                    requested = config.duration_secs * config.sampling_rate_hz,
                    capacity = state.buffer.capacity(),
                    "session target exceeds buffer capacity, samples will be truncated"
                );
            }
            state.begin_run(config);
            (
                state.session_id,
                state.epoch,
                config.total_samples(state.buffer.capacity()),
            )
        };

        tracing::info!(
            session_id = ?session_id,
            duration_secs = config.duration_secs,
            sampling_rate_hz = config.sampling_rate_hz,
            total_samples = total,
            "session started"
        );
        let _ = self.events.send(SessionEvent::Started { session_id, total_samples: total });

        self.spawn_sampler(config, epoch);
        Ok(session_id)
    }

    /// Feed one detector observation: `Some` with the landmark sequence,
    /// or `None` for an explicit no-landmarks signal. Returns the
    /// continuous scores for the observation.
    pub async fn observe(&self, frame: Option<LandmarkFrame>) -> ScoreSet {
        let mut guard = self.inner.write().await;
        let state = &mut *guard;

        match frame {
            Some(frame) if !frame.is_empty() => {
                if state.pose_lost {
                    state.pose_lost = false;
                    let _ = self.events.send(SessionEvent::PoseRegained);
                }
                state.frames_without_pose = 0;

                let scores = state.scorer.score(&frame, state.previous.as_ref());
                state.previous_scores = state.latest_scores;
                state.latest_scores = scores;
                if state.score_gate.try_fire() {
                    let _ = self.events.send(SessionEvent::ScoresUpdated(scores));
                }

                state.previous = state.latest.take();
                state.latest = Some(frame);
                scores
            }
            _ => {
                state.latest = None;
                state.frames_without_pose = state.frames_without_pose.saturating_add(1);
                if state.phase == Phase::Active
                    && !state.pose_lost
                    && state.frames_without_pose > state.pose_loss_frames
                {
                    state.pose_lost = true;
                    tracing::warn!(
                        frames = state.frames_without_pose,
                        "pose lost from landmark stream"
                    );
                    let _ = self.events.send(SessionEvent::PoseLost);
                }
                state.latest_scores
            }
        }
    }

    /// Force the session back to Idle. Valid from Active or Finalizing;
    /// the buffer is frozen but stays readable, and any in-flight
    /// narrative result is discarded.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.write().await;
            if state.phase == Phase::Idle {
                return;
            }
            state.epoch += 1;
            state.phase = Phase::Idle;
            state.latest = None;
            state.previous = None;
            state.frames_without_pose = 0;
            state.pose_lost = false;
        }
        tracing::info!("session stopped");
        let _ = self.events.send(SessionEvent::Stopped);
    }

    /// Return to the initial state unconditionally: clears the buffer
    /// and all derived trend state. Idempotent from Idle.
    pub async fn reset(&self) {
        let was_running = {
            let mut state = self.inner.write().await;
            let was_running = state.phase != Phase::Idle;
            state.epoch += 1;
            state.phase = Phase::Idle;
            state.buffer.clear();
            state.scorer.reset();
            state.latest = None;
            state.previous = None;
            state.latest_scores = ScoreSet::zero();
            state.previous_scores = ScoreSet::zero();
            state.second = 1;
            state.slot = 0;
            state.frames_without_pose = 0;
            state.pose_lost = false;
            state.score_gate.reset();
            state.progress_gate.reset();
            was_running
        };
        if was_running {
            let _ = self.events.send(SessionEvent::Stopped);
        }
    }

    /// Spawn the sampling clock for the current run. The task exits on
    /// its own as soon as the epoch moves or the phase leaves Active.
    fn spawn_sampler(&self, config: SessionConfig, epoch: u64) {
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let backend = Arc::clone(&self.backend);
        let narrative_timeout = self.narrative_timeout;

        tokio::spawn(async move {
            let period = config.sample_period();
            let mut clock = interval_at(Instant::now() + period, period);
            clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                clock.tick().await;
                let done = {
                    let mut state = inner.write().await;
                    if state.epoch != epoch || state.phase != Phase::Active {
                        return;
                    }
                    state.sample_tick(&events)
                };
                if done {
                    break;
                }
            }

            finalize_run(inner, events, backend, config, epoch, narrative_timeout).await;
        });
    }
}

/// Freeze the buffer, assemble the report, attach a narrative (external
/// with local fallback), and return to Idle. Bails out silently at any
/// point where the epoch shows the session was stopped or reset.
async fn finalize_run(
    inner: Arc<RwLock<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    backend: Arc<dyn NarrativeBackend>,
    config: SessionConfig,
    epoch: u64,
    narrative_timeout: Duration,
) {
    let (session_id, samples) = {
        let mut state = inner.write().await;
        if state.epoch != epoch || state.phase != Phase::Active {
            return;
        }
        state.phase = Phase::Finalizing;
        (state.session_id, state.buffer.snapshot())
    };

    tracing::info!(session_id = ?session_id, samples = samples.len(), "finalizing session");
    let _ = events.send(SessionEvent::Finalizing);

    let report = assemble(session_id, samples, &config);
    let narrative = narrate(backend.as_ref(), &report, narrative_timeout).await;
    let report: Report = report.with_narrative(narrative);

    {
        let mut state = inner.write().await;
        if state.epoch != epoch {
            // Stopped while the narrative call was in flight; the stop
            // already owns the state machine.
            return;
        }
        state.phase = Phase::Idle;
    }

    tracing::info!(
        session_id = ?session_id,
        degraded = report.is_degraded(),
        "session complete"
    );
    let _ = events.send(SessionEvent::Complete(report));
}
