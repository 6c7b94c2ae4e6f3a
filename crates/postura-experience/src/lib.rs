//! Postura Experience - The guided session
//!
//! A session walks the user through an ordered phase table:
//! - Phases advance on a held pose, a delay after narration, or narration end
//! - Narration gates everything: nothing advances while audio plays
//! - Presentation happens through [`Cue`]s the caller drains after each call
//!
//! The [`PhaseMachine`] is synchronous and clock-free. Callers pass `now` in,
//! and report narration completion back through
//! [`PhaseMachine::narration_finished`].

pub mod cue;
pub mod machine;
pub mod phase;
pub mod progress;

pub use cue::*;
pub use machine::*;
pub use phase::*;
pub use progress::*;
