//! # Kinemetry-Session
//!
//! The analysis session state machine. Orchestrates a timed run:
//!
//! ```text
//! Idle --start(config)--> Active --cap/duration--> Finalizing --> Idle
//!          ^                  |                        |
//!          +------ stop() ----+----------- stop() -----+
//! ```
//!
//! Two independently-paced inputs feed one serialized state: the
//! landmark stream (continuous scoring, pose-loss tracking) and the
//! sampling clock (feature extraction into the bounded buffer). Display
//! updates are throttled by a leading-edge scheduler; sampling never is.

pub mod config;
pub mod controller;
pub mod events;
pub mod scheduler;

pub use config::*;
pub use controller::*;
pub use events::*;
pub use scheduler::*;
