//! Per-frame progress reports

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the session is doing after a processed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Progress {
    /// Narration is playing; poses are not evaluated
    AudioPlaying { name: String },
    /// Time phase counting down after narration
    Waiting { name: String },
    /// Pose phase hold timer
    Holding {
        is_valid: bool,
        current: Duration,
        total: Duration,
        name: String,
        /// Failing frame absorbed without resetting the hold
        jitter_tolerance: bool,
    },
}

impl Progress {
    pub fn name(&self) -> &str {
        match self {
            Progress::AudioPlaying { name }
            | Progress::Waiting { name }
            | Progress::Holding { name, .. } => name,
        }
    }

    /// Hold completion in [0, 1]; zero for non-hold reports
    pub fn fraction(&self) -> f32 {
        match self {
            Progress::Holding { current, total, .. } if !total.is_zero() => {
                (current.as_secs_f32() / total.as_secs_f32()).min(1.0)
            }
            _ => 0.0,
        }
    }

    /// Overlay colour for the skeleton
    pub fn tint(&self) -> SkeletonTint {
        match self {
            Progress::Holding { is_valid: true, .. } => SkeletonTint::Success,
            Progress::Holding { .. } => SkeletonTint::Warning,
            _ => SkeletonTint::Default,
        }
    }
}

/// Skeleton overlay colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonTint {
    #[default]
    Default,
    Success,
    Warning,
}

impl SkeletonTint {
    pub fn for_progress(progress: Option<&Progress>) -> Self {
        progress.map(Progress::tint).unwrap_or_default()
    }
}
