//! Postura Test Harness - Fixtures, simulation and scenarios
//!
//! This crate provides:
//! - Frame fixtures for the poses the session asks for
//! - A deterministic session simulator (manual clock, timed narration,
//!   seeded tracking dropouts)
//! - End-to-end scenarios over the default script and the async driver

pub mod fixtures;
pub mod integration;
pub mod simulator;

pub use fixtures::*;
pub use integration::*;
pub use simulator::*;
