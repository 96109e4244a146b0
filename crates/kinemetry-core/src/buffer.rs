//! The bounded, time-ordered sample buffer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::features::FeatureSet;
use crate::landmark::{Landmark, LandmarkFrame};

/// Default buffer capacity per session.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 100;

/// One buffered, feature-annotated snapshot taken at the sampling
/// cadence. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// 1-based second index within the session.
    pub second: u32,
    /// 1-based slot index within the second.
    pub slot: u32,
    /// Visible landmarks only, keyed by anatomical name.
    pub landmarks: BTreeMap<String, Landmark>,
    pub features: FeatureSet,
}

impl Sample {
    /// Build a sample from an observation, keeping only the landmarks
    /// above the visibility threshold.
    pub fn from_frame(second: u32, slot: u32, frame: &LandmarkFrame, features: FeatureSet) -> Self {
        let landmarks = frame
            .iter()
            .filter(|(_, lm)| lm.is_visible())
            .map(|(idx, lm)| (idx.name().to_string(), *lm))
            .collect();
        Self { second, slot, landmarks, features }
    }
}

/// Append-only, capacity-bounded collection of session samples.
///
/// Appends past capacity are dropped silently by contract: the session
/// controller independently stops sampling at the cap, so a full buffer
/// is an expected terminal condition, not an error. Index assignment
/// (`second`, `slot`) is the caller's responsibility.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { samples: Vec::with_capacity(capacity.min(DEFAULT_SAMPLE_CAPACITY)), capacity }
    }

    /// Append a sample. Returns whether it was stored.
    pub fn append(&mut self, sample: Sample) -> bool {
        if self.samples.len() >= self.capacity {
            return false;
        }
        self.samples.push(sample);
        true
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Immutable copy of the buffered samples, for report assembly.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.clone()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_CAPACITY)
    }
}
