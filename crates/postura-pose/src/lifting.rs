//! Lifting-posture analysis
//!
//! Stateless scoring of a single frame against three safe-lifting rules:
//! straight back, flexed knees, load held close to the torso.

use serde::{Deserialize, Serialize};

use postura_core::{
    angle_at, centroid, distance, midpoint, vertical_deviation, Frame, Keypoint, Landmark,
    LiftingThresholds,
};

const BACK_POINTS: u8 = 33;
const KNEE_POINTS: u8 = 33;
const LOAD_POINTS: u8 = 34;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Result of one lifting-posture analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftingAnalysis {
    /// Torso deviation from vertical, degrees
    pub back_angle: f32,
    /// Mean of both knee angles, degrees
    pub knee_angle: f32,
    /// Mean wrist distance to the torso centre, normalized units
    pub hand_distance: f32,
    pub is_back_straight: bool,
    pub are_knees_flexed: bool,
    pub is_load_close: bool,
    /// One line per rule, in rule order
    pub feedback: Vec<String>,
    /// 0-100; 33 + 33 + 34 for the three rules
    pub score: u8,
    pub is_perfect: bool,
}

impl LiftingAnalysis {
    /// Feedback joined for a single overlay line
    pub fn feedback_line(&self) -> String {
        self.feedback.join(" | ")
    }
}

fn require(frame: &Frame, keypoint: Keypoint) -> Option<&Landmark> {
    frame.get(keypoint)
}

/// Deviation of the shoulder-hip line from vertical
pub fn back_angle(frame: &Frame) -> Option<f32> {
    let shoulders = midpoint(
        require(frame, Keypoint::LeftShoulder)?,
        require(frame, Keypoint::RightShoulder)?,
    );
    let hips = midpoint(
        require(frame, Keypoint::LeftHip)?,
        require(frame, Keypoint::RightHip)?,
    );
    Some(vertical_deviation(&shoulders, &hips))
}

/// Hip-knee-ankle angle; 180 is a locked knee
pub fn knee_angle(frame: &Frame, side: Side) -> Option<f32> {
    let (hip, knee, ankle) = match side {
        Side::Left => (Keypoint::LeftHip, Keypoint::LeftKnee, Keypoint::LeftAnkle),
        Side::Right => (Keypoint::RightHip, Keypoint::RightKnee, Keypoint::RightAnkle),
    };
    Some(angle_at(
        require(frame, hip)?,
        require(frame, knee)?,
        require(frame, ankle)?,
    ))
}

/// Mean 3-D distance from both wrists to the centre of the torso
pub fn hand_to_torso_distance(frame: &Frame) -> Option<f32> {
    let torso = centroid(&[
        require(frame, Keypoint::LeftShoulder)?,
        require(frame, Keypoint::RightShoulder)?,
        require(frame, Keypoint::LeftHip)?,
        require(frame, Keypoint::RightHip)?,
    ])?;
    let left = distance(require(frame, Keypoint::LeftWrist)?, &torso);
    let right = distance(require(frame, Keypoint::RightWrist)?, &torso);
    Some((left + right) / 2.0)
}

/// Score a frame against the lifting rules
///
/// Returns `None` for frames shorter than the full skeleton or missing any
/// landmark the rules need.
pub fn analyze_lifting_posture(
    frame: &Frame,
    thresholds: &LiftingThresholds,
) -> Option<LiftingAnalysis> {
    if !frame.is_complete() {
        return None;
    }

    let back = back_angle(frame)?;
    let knees = (knee_angle(frame, Side::Left)? + knee_angle(frame, Side::Right)?) / 2.0;
    let hands = hand_to_torso_distance(frame)?;

    let is_back_straight = back < thresholds.straight_back_angle;
    let are_knees_flexed = knees < thresholds.knees_flexed_angle;
    let is_load_close = hands < thresholds.load_close_distance;

    let mut feedback = Vec::with_capacity(3);
    let mut score = 0u8;

    if is_back_straight {
        feedback.push("Great, back straight".to_string());
        score += BACK_POINTS;
    } else {
        feedback.push("Careful: you are bending your back. Keep your spine straight".to_string());
    }

    if are_knees_flexed {
        feedback.push("Good, knees bent".to_string());
        score += KNEE_POINTS;
    } else {
        feedback.push("Careful: bend your knees more. Squat down".to_string());
    }

    if is_load_close {
        feedback.push("Perfect, load close to the body".to_string());
        score += LOAD_POINTS;
    } else {
        feedback.push("Careful: bring your hands closer to your torso".to_string());
    }

    Some(LiftingAnalysis {
        back_angle: back,
        knee_angle: knees,
        hand_distance: hands,
        is_back_straight,
        are_knees_flexed,
        is_load_close,
        feedback,
        score,
        is_perfect: is_back_straight && are_knees_flexed && is_load_close,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Squatting lifter: upright torso, bent knees, hands at the belly
    fn squat() -> Frame {
        let mut frame = Frame::from_landmarks(vec![Landmark::at(0.5, 0.5); Keypoint::COUNT]);
        let mut put = |kp, x, y| frame.set(kp, Landmark::at(x, y));
        put(Keypoint::LeftShoulder, 0.60, 0.30);
        put(Keypoint::RightShoulder, 0.40, 0.30);
        put(Keypoint::LeftHip, 0.58, 0.60);
        put(Keypoint::RightHip, 0.42, 0.60);
        put(Keypoint::LeftKnee, 0.70, 0.70);
        put(Keypoint::RightKnee, 0.30, 0.70);
        put(Keypoint::LeftAnkle, 0.60, 0.90);
        put(Keypoint::RightAnkle, 0.40, 0.90);
        put(Keypoint::LeftWrist, 0.55, 0.50);
        put(Keypoint::RightWrist, 0.45, 0.50);
        frame
    }

    /// Stooped lifter: torso pitched forward, legs locked, arms reaching
    fn stoop() -> Frame {
        let mut frame = squat();
        let mut put = |kp, x, y| frame.set(kp, Landmark::at(x, y));
        put(Keypoint::LeftShoulder, 0.90, 0.55);
        put(Keypoint::RightShoulder, 0.80, 0.55);
        put(Keypoint::LeftKnee, 0.58, 0.75);
        put(Keypoint::RightKnee, 0.42, 0.75);
        put(Keypoint::LeftAnkle, 0.58, 0.90);
        put(Keypoint::RightAnkle, 0.42, 0.90);
        put(Keypoint::LeftWrist, 0.95, 0.95);
        put(Keypoint::RightWrist, 0.90, 0.95);
        frame
    }

    #[test]
    fn test_good_lift_scores_full() {
        let analysis = analyze_lifting_posture(&squat(), &LiftingThresholds::default()).unwrap();
        assert!(analysis.is_back_straight);
        assert!(analysis.are_knees_flexed);
        assert!(analysis.is_load_close);
        assert!(analysis.is_perfect);
        assert_eq!(analysis.score, 100);
        assert_eq!(analysis.feedback.len(), 3);
    }

    #[test]
    fn test_bad_lift_scores_zero() {
        let analysis = analyze_lifting_posture(&stoop(), &LiftingThresholds::default()).unwrap();
        assert!(!analysis.is_back_straight);
        assert!(!analysis.are_knees_flexed);
        assert!(!analysis.is_load_close);
        assert_eq!(analysis.score, 0);
        assert!(analysis.feedback_line().contains(" | "));
    }

    #[test]
    fn test_partial_score() {
        let mut frame = squat();
        frame.set(Keypoint::LeftWrist, Landmark::at(0.95, 0.95));
        frame.set(Keypoint::RightWrist, Landmark::at(0.90, 0.95));
        let analysis = analyze_lifting_posture(&frame, &LiftingThresholds::default()).unwrap();
        assert_eq!(analysis.score, BACK_POINTS + KNEE_POINTS);
        assert!(!analysis.is_perfect);
    }

    #[test]
    fn test_short_frame_is_rejected() {
        let frame = Frame::from_landmarks(vec![Landmark::at(0.5, 0.5); 25]);
        assert!(analyze_lifting_posture(&frame, &LiftingThresholds::default()).is_none());
    }

    #[test]
    fn test_missing_knee_is_rejected() {
        let mut frame = squat();
        frame.clear(Keypoint::RightKnee);
        assert!(knee_angle(&frame, Side::Right).is_none());
        assert!(analyze_lifting_posture(&frame, &LiftingThresholds::default()).is_none());
    }

    #[test]
    fn test_locked_knee_is_straight() {
        let mut frame = squat();
        frame.set(Keypoint::LeftKnee, Landmark::at(0.58, 0.75));
        frame.set(Keypoint::LeftAnkle, Landmark::at(0.58, 0.90));
        let angle = knee_angle(&frame, Side::Left).unwrap();
        assert!((angle - 180.0).abs() < 1e-3);
    }
}
