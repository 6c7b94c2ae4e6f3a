//! Postura Pose - what the body is doing, frame by frame
//!
//! This crate turns raw tracker frames into answers:
//! - Smoothing: a short rolling mean that trades ~2 frames of latency for stability
//! - Predicates: calibration framing, straight back, open posture, smile, gestures
//! - Lifting analysis: stateless back/knee/load scoring for the lifting trainer
//!
//! Predicates never fail loudly. Missing or low-visibility landmarks simply
//! mean "not achieved", and the caller retries on the next frame.

pub mod check;
pub mod lifting;
pub mod predicates;
pub mod smoothing;

pub use check::*;
pub use lifting::*;
pub use predicates::*;
pub use smoothing::*;
