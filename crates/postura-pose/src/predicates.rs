//! Pose predicates
//!
//! Each predicate reads a (smoothed) frame and answers one question about the
//! user's pose. All of them fail closed: a missing or barely visible landmark
//! means "not achieved", never an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use postura_core::{
    midpoint, planar_distance, vertical_deviation, Frame, Keypoint, Landmark, SessionTime,
    Thresholds,
};

use crate::check::{GuideStatus, PoseCheck};

/// Hands-on-chest target sits this far below the shoulder line
const CHEST_OFFSET_Y: f32 = 0.15;
const CHEST_RADIUS: f32 = 0.2;
/// Neutral stance: wrists hang this far below the shoulders...
const NEUTRAL_HANG: f32 = 0.3;
/// ...and stay this close to them horizontally
const NEUTRAL_REACH: f32 = 0.2;

fn pair(frame: &Frame, a: Keypoint, b: Keypoint) -> Option<(&Landmark, &Landmark)> {
    Some((frame.get(a)?, frame.get(b)?))
}

// ============================================================================
// CALIBRATION
// ============================================================================

/// Is the user framed inside the face and shoulder guides?
///
/// Shoulder width doubles as a distance check: too narrow means too far from
/// the camera, too wide means too close.
pub fn detect_correct_positioning(frame: &Frame, t: &Thresholds) -> PoseCheck {
    let (Some(nose), Some((ls, rs))) = (
        frame.get(Keypoint::Nose),
        pair(frame, Keypoint::LeftShoulder, Keypoint::RightShoulder),
    ) else {
        return PoseCheck::fail();
    };

    let floor = t.visibility_min_loose;
    if nose.visibility < floor || ls.visibility < floor || rs.visibility < floor {
        debug!(
            nose = nose.visibility,
            left_shoulder = ls.visibility,
            right_shoulder = rs.visibility,
            "calibration: low visibility"
        );
        return PoseCheck::fail();
    }

    let g = &t.guides;
    let shoulders = midpoint(ls, rs);
    let shoulder_width = (ls.x - rs.x).abs();

    let face_in_range = (nose.y - g.face_y).abs() < g.face_height / 2.0 + g.tolerance;
    let shoulders_in_y = (shoulders.y - g.shoulder_y).abs() < g.shoulder_height / 2.0 + g.tolerance;
    let shoulders_in_x = (shoulders.x - g.shoulder_x).abs() < g.shoulder_width / 2.0 + g.tolerance;
    let width_ok = shoulder_width > t.min_shoulder_width && shoulder_width < t.max_shoulder_width;

    let face_valid = face_in_range;
    let shoulders_valid = shoulders_in_y && shoulders_in_x && width_ok;

    if !(face_valid && shoulders_valid) {
        debug!(
            face_y = nose.y,
            shoulder_x = shoulders.x,
            shoulder_y = shoulders.y,
            shoulder_width,
            face_valid,
            shoulders_in_x,
            shoulders_in_y,
            width_ok,
            "calibration: outside guides"
        );
    }

    PoseCheck {
        achieved: face_valid && shoulders_valid,
        detail: Some(GuideStatus {
            face_valid,
            shoulders_valid,
        }),
    }
}

// ============================================================================
// STRAIGHT BACK
// ============================================================================

/// Reference posture captured when the hips are out of frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackBaseline {
    pub shoulder_mid_y: f32,
    pub nose_y: f32,
    pub captured_at: SessionTime,
}

/// How the straight-back verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackMethod {
    /// Shoulders aligned over visible hips
    HipAlignment,
    /// No slouch since the captured baseline
    BaselineDrift,
    /// Shoulders missing, nothing to judge
    Unavailable,
}

/// Straight-back verdict plus the baseline the caller must persist
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackCheck {
    pub achieved: bool,
    pub baseline: Option<BackBaseline>,
    pub method: BackMethod,
}

/// Is the user's back straight?
///
/// With both hips visible the shoulder midpoint must sit over the hip
/// midpoint. Seated users usually have their hips out of frame, so the
/// fallback compares against a baseline instead: level shoulders, and no drop
/// of shoulders or nose since the baseline was captured. The frame that
/// captures the baseline always reports `false`.
pub fn detect_straight_back(
    frame: &Frame,
    t: &Thresholds,
    baseline: Option<BackBaseline>,
    now: SessionTime,
) -> BackCheck {
    let Some((ls, rs)) = pair(frame, Keypoint::LeftShoulder, Keypoint::RightShoulder) else {
        return BackCheck {
            achieved: false,
            baseline,
            method: BackMethod::Unavailable,
        };
    };

    let floor = t.back_visibility_min;
    let hips = pair(frame, Keypoint::LeftHip, Keypoint::RightHip)
        .filter(|(lh, rh)| lh.visibility > floor && rh.visibility > floor);

    let Some((lh, rh)) = hips else {
        return baseline_back_check(frame, ls, rs, t, baseline, now);
    };

    if ls.visibility < floor || rs.visibility < floor {
        return BackCheck {
            achieved: false,
            baseline,
            method: BackMethod::HipAlignment,
        };
    }

    let shoulders = midpoint(ls, rs);
    let hip_mid = midpoint(lh, rh);
    let offset = (shoulders.x - hip_mid.x).abs();
    let angle = vertical_deviation(&shoulders, &hip_mid);

    BackCheck {
        achieved: offset < t.back_max_horizontal_offset && angle < t.back_max_vertical_angle,
        baseline,
        method: BackMethod::HipAlignment,
    }
}

fn baseline_back_check(
    frame: &Frame,
    ls: &Landmark,
    rs: &Landmark,
    t: &Thresholds,
    baseline: Option<BackBaseline>,
    now: SessionTime,
) -> BackCheck {
    let fail = BackCheck {
        achieved: false,
        baseline,
        method: BackMethod::BaselineDrift,
    };

    let Some(nose) = frame.get(Keypoint::Nose) else {
        return fail;
    };
    let floor = t.back_visibility_min;
    if ls.visibility < floor || rs.visibility < floor || nose.visibility < floor {
        return fail;
    }

    if (ls.y - rs.y).abs() >= t.shoulder_level_tolerance {
        return fail;
    }

    let shoulder_mid_y = (ls.y + rs.y) / 2.0;

    let Some(reference) = baseline else {
        let captured = BackBaseline {
            shoulder_mid_y,
            nose_y: nose.y,
            captured_at: now,
        };
        info!(shoulder_mid_y, nose_y = nose.y, "back baseline captured");
        return BackCheck {
            achieved: false,
            baseline: Some(captured),
            method: BackMethod::BaselineDrift,
        };
    };

    // Image y grows downward: a positive drop means sinking
    let shoulder_drop = shoulder_mid_y - reference.shoulder_mid_y;
    let nose_drop = nose.y - reference.nose_y;

    BackCheck {
        achieved: shoulder_drop < t.slouch_max_shoulder_drop && nose_drop < t.slouch_max_nose_drop,
        baseline,
        method: BackMethod::BaselineDrift,
    }
}

// ============================================================================
// OPEN POSTURE & GESTURES
// ============================================================================

/// Arms open: wrists spread wider than half the shoulders, not hanging down
pub fn detect_open_posture(frame: &Frame, t: &Thresholds) -> bool {
    let (Some((lw, rw)), Some((ls, rs))) = (
        pair(frame, Keypoint::LeftWrist, Keypoint::RightWrist),
        pair(frame, Keypoint::LeftShoulder, Keypoint::RightShoulder),
    ) else {
        return false;
    };

    if lw.visibility < t.visibility_min || rw.visibility < t.visibility_min {
        return false;
    }

    let shoulder_width = (ls.x - rs.x).abs();
    let spread = (lw.x - rw.x).abs() > shoulder_width * t.open_posture_spread_ratio;
    let raised = lw.y - ls.y < t.open_posture_max_wrist_drop
        && rw.y - rs.y < t.open_posture_max_wrist_drop;

    spread && raised
}

/// Both wrists clearly above their shoulders
pub fn detect_arms_up(frame: &Frame, t: &Thresholds) -> bool {
    let (Some((lw, rw)), Some((ls, rs))) = (
        pair(frame, Keypoint::LeftWrist, Keypoint::RightWrist),
        pair(frame, Keypoint::LeftShoulder, Keypoint::RightShoulder),
    ) else {
        return false;
    };

    if [lw, rw, ls, rs].iter().any(|p| p.visibility < t.visibility_min) {
        return false;
    }

    lw.y < ls.y - t.arms_up_margin && rw.y < rs.y - t.arms_up_margin
}

/// Both wrists resting near the centre of the chest
pub fn detect_hands_on_chest(frame: &Frame) -> bool {
    let (Some((lw, rw)), Some((ls, rs))) = (
        pair(frame, Keypoint::LeftWrist, Keypoint::RightWrist),
        pair(frame, Keypoint::LeftShoulder, Keypoint::RightShoulder),
    ) else {
        return false;
    };

    let mut chest = midpoint(ls, rs);
    chest.y += CHEST_OFFSET_Y;

    planar_distance(lw, &chest) < CHEST_RADIUS && planar_distance(rw, &chest) < CHEST_RADIUS
}

/// Arms relaxed at the sides
pub fn detect_neutral(frame: &Frame) -> bool {
    let (Some((lw, rw)), Some((ls, rs))) = (
        pair(frame, Keypoint::LeftWrist, Keypoint::RightWrist),
        pair(frame, Keypoint::LeftShoulder, Keypoint::RightShoulder),
    ) else {
        return false;
    };

    let hands_down = lw.y > ls.y + NEUTRAL_HANG && rw.y > rs.y + NEUTRAL_HANG;
    let hands_close = (lw.x - ls.x).abs() < NEUTRAL_REACH && (rw.x - rs.x).abs() < NEUTRAL_REACH;
    hands_down && hands_close
}

// ============================================================================
// SMILE
// ============================================================================

/// Wide mouth relative to the eyes, without the mouth riding up to the eyes
///
/// The elevation bound rejects ratios produced by a frown or a strongly
/// tilted head.
pub fn detect_smile(frame: &Frame, t: &Thresholds) -> bool {
    let (Some((ml, mr)), Some((el, er))) = (
        pair(frame, Keypoint::MouthLeft, Keypoint::MouthRight),
        pair(frame, Keypoint::LeftEyeOuter, Keypoint::RightEyeOuter),
    ) else {
        return false;
    };

    let eye_width = planar_distance(el, er);
    if eye_width <= f32::EPSILON {
        return false;
    }

    let width_ratio = planar_distance(ml, mr) / eye_width;
    let mouth_elevation = (el.y + er.y) / 2.0 - (ml.y + mr.y) / 2.0;

    width_ratio > t.smile_min_width_ratio && mouth_elevation < t.smile_max_elevation
}
