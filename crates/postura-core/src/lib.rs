//! Postura Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every Postura component:
//! - Landmarks and frames (the fixed 33-point body layout)
//! - Geometry over landmarks (angles, distances, midpoints)
//! - Session time and clocks
//! - Detection thresholds and device classes

pub mod config;
pub mod error;
pub mod geometry;
pub mod landmark;
pub mod time;

pub use config::*;
pub use error::*;
pub use geometry::*;
pub use landmark::*;
pub use time::*;
