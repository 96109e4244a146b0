//! # Kinemetry-Report
//!
//! Turns a finished session's sample buffer into a [`Report`]: pure
//! metadata + sample assembly, a prompt for an external chat-completions
//! narrative backend, and a deterministic local fallback used whenever
//! the external call fails or times out.
//!
//! ```text
//! SampleBuffer snapshot
//!     |
//! [assemble] -> Report { metadata, samples }
//!     |
//! [narrate] -> External(content) on backend success
//!           -> Local(template)   on error / timeout
//! ```

pub mod assembler;
pub mod local;
pub mod narrative;
pub mod prompts;

pub use assembler::*;
pub use local::*;
pub use narrative::*;
pub use prompts::*;
