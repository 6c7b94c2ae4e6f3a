//! Presentation cues and narration events
//!
//! The phase machine never touches a screen or a speaker. It queues cues and
//! the driver hands them to whatever presents them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one narration request
///
/// Completion reports carrying a stale ticket are ignored, so a narration
/// that was superseded or stopped can never advance the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NarrationTicket(pub u64);

impl fmt::Display for NarrationTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "narration#{}", self.0)
    }
}

/// How a narration ended
///
/// A failure counts as completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Failed(String),
}

/// Something the presentation layer should do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum Cue {
    // Calibration overlay
    ShowCalibrationGuides,
    HideCalibrationGuides,
    /// Status line with hold percentage
    CalibrationStatus { is_correct: bool, percent: u8 },
    GuideFeedback { face_valid: bool, shoulders_valid: bool },
    /// First full success since the last failure
    ValidationChime,

    // Lighting
    ShowLightingWarning,
    HideLightingWarning,

    // Phase presentation
    PhaseNotification { name: String },
    Subtitle { text: String },

    // Audio
    PlayEffect { audio_ref: String },
    PlayNarration { ticket: NarrationTicket, audio_ref: String },
    StopNarration,
}
