//! Postura Runtime - Driving a session from a camera
//!
//! The runtime owns everything with a side effect:
//! - The frame loop: stride gating, detection, smoothing, the phase machine
//! - Narration playback and its completion events
//! - Presentation of cues and progress
//! - Configuration loading and tracing setup
//!
//! The loop is single-threaded. Narration runs on spawned tasks and reports
//! back over a channel; completions are applied from the loop only.

pub mod audio;
pub mod config;
pub mod driver;
pub mod gate;
pub mod presenter;
pub mod source;
pub mod telemetry;

pub use audio::*;
pub use config::*;
pub use driver::*;
pub use gate::*;
pub use presenter::*;
pub use source::*;
pub use telemetry::*;
