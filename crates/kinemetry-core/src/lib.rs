//! # Kinemetry-Core
//!
//! Core types and pure computations for the Kinemetry body-landmark
//! session analyzer: the 33-point landmark schema, continuous geometry
//! scoring, per-sample feature extraction, and the bounded sample buffer.

pub mod buffer;
pub mod config;
pub mod error;
pub mod features;
pub mod landmark;
pub mod scoring;

pub use buffer::*;
pub use config::*;
pub use error::{Error, Result};
pub use features::*;
pub use landmark::*;
pub use scoring::*;
