//! Unified predicate results and the predicate lookup table

use serde::{Deserialize, Serialize};

use postura_core::{Frame, SessionTime, Thresholds};

use crate::predicates::{
    detect_arms_up, detect_correct_positioning, detect_hands_on_chest, detect_neutral,
    detect_open_posture, detect_smile, detect_straight_back, BackBaseline,
};

/// Which calibration guides the user currently satisfies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GuideStatus {
    pub face_valid: bool,
    pub shoulders_valid: bool,
}

/// Outcome of one predicate on one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoseCheck {
    pub achieved: bool,
    /// Per-guide breakdown, when the predicate has one
    pub detail: Option<GuideStatus>,
}

impl PoseCheck {
    pub fn fail() -> Self {
        PoseCheck::default()
    }

    /// Guide state for the overlay; plain predicates light both guides alike
    pub fn guides(&self) -> GuideStatus {
        self.detail.unwrap_or(GuideStatus {
            face_valid: self.achieved,
            shoulders_valid: self.achieved,
        })
    }
}

impl From<bool> for PoseCheck {
    fn from(achieved: bool) -> Self {
        PoseCheck {
            achieved,
            detail: None,
        }
    }
}

/// Everything a predicate may read or persist besides the frame
pub struct PredicateContext<'a> {
    pub thresholds: &'a Thresholds,
    /// Straight-back baseline, owned by the caller's session
    pub baseline: &'a mut Option<BackBaseline>,
    pub now: SessionTime,
}

/// Stable identifier for a pose predicate
///
/// Phase tables reference predicates by id so they stay plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateId {
    CalibrationFit,
    StraightBack,
    OpenPosture,
    Smile,
    ArmsUp,
    HandsOnChest,
    Neutral,
}

impl PredicateId {
    pub fn all() -> &'static [PredicateId] {
        &[
            PredicateId::CalibrationFit,
            PredicateId::StraightBack,
            PredicateId::OpenPosture,
            PredicateId::Smile,
            PredicateId::ArmsUp,
            PredicateId::HandsOnChest,
            PredicateId::Neutral,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            PredicateId::CalibrationFit => "calibration_fit",
            PredicateId::StraightBack => "straight_back",
            PredicateId::OpenPosture => "open_posture",
            PredicateId::Smile => "smile",
            PredicateId::ArmsUp => "arms_up",
            PredicateId::HandsOnChest => "hands_on_chest",
            PredicateId::Neutral => "neutral",
        }
    }

    /// Run the predicate this id names
    pub fn evaluate(self, frame: &Frame, ctx: &mut PredicateContext<'_>) -> PoseCheck {
        let t = ctx.thresholds;
        match self {
            PredicateId::CalibrationFit => detect_correct_positioning(frame, t),
            PredicateId::StraightBack => {
                let back = detect_straight_back(frame, t, *ctx.baseline, ctx.now);
                *ctx.baseline = back.baseline;
                back.achieved.into()
            }
            PredicateId::OpenPosture => detect_open_posture(frame, t).into(),
            PredicateId::Smile => detect_smile(frame, t).into(),
            PredicateId::ArmsUp => detect_arms_up(frame, t).into(),
            PredicateId::HandsOnChest => detect_hands_on_chest(frame).into(),
            PredicateId::Neutral => detect_neutral(frame).into(),
        }
    }
}

impl std::fmt::Display for PredicateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
