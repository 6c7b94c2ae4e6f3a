//! Frame fixtures
//!
//! Every fixture is a complete 33-landmark frame in normalized image
//! coordinates (y grows downward), as a pose tracker would report it.

use postura_core::{Frame, Keypoint, Landmark};
use postura_pose::PredicateId;

/// Visibility the tracker gives to body parts out of frame
pub const OUT_OF_FRAME_VISIBILITY: f32 = 0.08;

/// Builds frames by editing a base skeleton
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    frame: Frame,
}

impl FrameBuilder {
    /// All 33 landmarks at the frame centre
    pub fn new() -> Self {
        FrameBuilder {
            frame: Frame::from_landmarks(vec![Landmark::at(0.5, 0.5); Keypoint::COUNT]),
        }
    }

    /// User sitting at a desk, framed for the desktop guides, hips below the frame
    pub fn seated() -> Self {
        FrameBuilder::new()
            .face(0.50, 0.30)
            .shoulders(0.65, 0.35, 0.66)
            .point(Keypoint::LeftElbow, 0.70, 0.82)
            .point(Keypoint::RightElbow, 0.30, 0.82)
            .wrists((0.66, 0.98), (0.34, 0.98))
            .point(Keypoint::LeftHip, 0.60, 1.05)
            .point(Keypoint::RightHip, 0.40, 1.05)
            .point(Keypoint::LeftKnee, 0.62, 1.30)
            .point(Keypoint::RightKnee, 0.38, 1.30)
            .point(Keypoint::LeftAnkle, 0.62, 1.55)
            .point(Keypoint::RightAnkle, 0.38, 1.55)
            .lower_body_visibility(OUT_OF_FRAME_VISIBILITY)
    }

    /// Whole body in frame, upright
    pub fn standing() -> Self {
        FrameBuilder::new()
            .face(0.50, 0.15)
            .shoulders(0.60, 0.40, 0.30)
            .point(Keypoint::LeftElbow, 0.63, 0.45)
            .point(Keypoint::RightElbow, 0.37, 0.45)
            .wrists((0.63, 0.60), (0.37, 0.60))
            .point(Keypoint::LeftHip, 0.58, 0.60)
            .point(Keypoint::RightHip, 0.42, 0.60)
            .point(Keypoint::LeftKnee, 0.58, 0.75)
            .point(Keypoint::RightKnee, 0.42, 0.75)
            .point(Keypoint::LeftAnkle, 0.58, 0.90)
            .point(Keypoint::RightAnkle, 0.42, 0.90)
            .lower_body_visibility(0.9)
    }

    /// Place the face with its eyes, ears and a relaxed mouth around the nose
    pub fn face(self, x: f32, y: f32) -> Self {
        self.point(Keypoint::Nose, x, y)
            .point(Keypoint::LeftEyeInner, x + 0.02, y - 0.05)
            .point(Keypoint::LeftEye, x + 0.03, y - 0.05)
            .point(Keypoint::LeftEyeOuter, x + 0.05, y - 0.05)
            .point(Keypoint::RightEyeInner, x - 0.02, y - 0.05)
            .point(Keypoint::RightEye, x - 0.03, y - 0.05)
            .point(Keypoint::RightEyeOuter, x - 0.05, y - 0.05)
            .point(Keypoint::LeftEar, x + 0.08, y - 0.03)
            .point(Keypoint::RightEar, x - 0.08, y - 0.03)
            .mouth_width(0.04)
    }

    /// Mouth corners centred under the nose
    pub fn mouth_width(self, width: f32) -> Self {
        let nose = self.at(Keypoint::Nose);
        self.point(Keypoint::MouthLeft, nose.x + width / 2.0, nose.y + 0.04)
            .point(Keypoint::MouthRight, nose.x - width / 2.0, nose.y + 0.04)
    }

    pub fn shoulders(self, left_x: f32, right_x: f32, y: f32) -> Self {
        self.point(Keypoint::LeftShoulder, left_x, y)
            .point(Keypoint::RightShoulder, right_x, y)
    }

    /// Move both wrists, dragging the hand points along
    pub fn wrists(self, left: (f32, f32), right: (f32, f32)) -> Self {
        self.point(Keypoint::LeftWrist, left.0, left.1)
            .point(Keypoint::LeftPinky, left.0 + 0.01, left.1 + 0.02)
            .point(Keypoint::LeftIndex, left.0, left.1 + 0.03)
            .point(Keypoint::LeftThumb, left.0 - 0.01, left.1 + 0.02)
            .point(Keypoint::RightWrist, right.0, right.1)
            .point(Keypoint::RightPinky, right.0 - 0.01, right.1 + 0.02)
            .point(Keypoint::RightIndex, right.0, right.1 + 0.03)
            .point(Keypoint::RightThumb, right.0 + 0.01, right.1 + 0.02)
    }

    /// Wrists relative to their shoulders
    pub fn wrists_from_shoulders(self, dx: f32, dy: f32) -> Self {
        let ls = self.at(Keypoint::LeftShoulder);
        let rs = self.at(Keypoint::RightShoulder);
        self.wrists((ls.x + dx, ls.y + dy), (rs.x - dx, rs.y + dy))
    }

    /// Move one landmark, keeping its visibility
    pub fn point(mut self, keypoint: Keypoint, x: f32, y: f32) -> Self {
        let visibility = self.frame.get(keypoint).map(|l| l.visibility).unwrap_or(1.0);
        self.frame
            .set(keypoint, Landmark::new(x, y, 0.0, visibility));
        self
    }

    pub fn visibility(mut self, keypoint: Keypoint, visibility: f32) -> Self {
        if let Some(landmark) = self.frame.get(keypoint).copied() {
            self.frame
                .set(keypoint, landmark.with_visibility(visibility));
        }
        self
    }

    pub fn all_visibility(mut self, visibility: f32) -> Self {
        for &keypoint in Keypoint::all() {
            self = self.visibility(keypoint, visibility);
        }
        self
    }

    /// Hips, legs and feet
    pub fn lower_body_visibility(mut self, visibility: f32) -> Self {
        for &keypoint in &Keypoint::all()[Keypoint::LeftHip.index()..] {
            self = self.visibility(keypoint, visibility);
        }
        self
    }

    pub fn without(mut self, keypoint: Keypoint) -> Self {
        self.frame.clear(keypoint);
        self
    }

    /// Translate the whole skeleton
    pub fn shift(mut self, dx: f32, dy: f32) -> Self {
        for &keypoint in Keypoint::all() {
            if let Some(l) = self.frame.get(keypoint).copied() {
                self.frame
                    .set(keypoint, Landmark::new(l.x + dx, l.y + dy, l.z, l.visibility));
            }
        }
        self
    }

    fn at(&self, keypoint: Keypoint) -> Landmark {
        self.frame
            .get(keypoint)
            .copied()
            .unwrap_or_else(|| Landmark::at(0.5, 0.5))
    }

    pub fn build(self) -> Frame {
        self.frame
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// NAMED POSES
// ============================================================================

/// Inside the desktop guides, sitting straight, arms relaxed
pub fn seated() -> Frame {
    FrameBuilder::seated().build()
}

/// Seated, but sunk down and forward after the baseline was taken
pub fn slouched() -> Frame {
    FrameBuilder::seated()
        .point(Keypoint::Nose, 0.50, 0.39)
        .shoulders(0.65, 0.35, 0.73)
        .build()
}

/// Seated with one shoulder clearly dropped
pub fn tilted() -> Frame {
    FrameBuilder::seated()
        .point(Keypoint::LeftShoulder, 0.65, 0.74)
        .build()
}

/// Too far to the side for the guides
pub fn off_center() -> Frame {
    FrameBuilder::seated().shift(0.45, 0.0).build()
}

/// Inside the mobile guides but not the desktop ones
pub fn mobile_framed() -> Frame {
    FrameBuilder::seated()
        .face(0.50, 0.05)
        .shoulders(0.70, 0.30, 0.30)
        .build()
}

pub fn standing() -> Frame {
    FrameBuilder::standing().build()
}

/// Standing, torso pitched to one side over the hips
pub fn leaning() -> Frame {
    FrameBuilder::standing()
        .shoulders(0.75, 0.55, 0.32)
        .build()
}

pub fn smiling() -> Frame {
    FrameBuilder::seated().mouth_width(0.07).build()
}

/// Wrists 0.15 above the shoulders
pub fn arms_up() -> Frame {
    FrameBuilder::seated().wrists_from_shoulders(0.0, -0.15).build()
}

/// Arms spread wide at chest height
pub fn arms_open() -> Frame {
    FrameBuilder::seated().wrists_from_shoulders(0.20, 0.04).build()
}

pub fn hands_on_chest() -> Frame {
    FrameBuilder::seated()
        .wrists((0.55, 0.80), (0.45, 0.80))
        .build()
}

/// Arms hanging at the sides
pub fn neutral() -> Frame {
    seated()
}

/// Face barely visible: poor lighting
pub fn dim_light() -> Frame {
    FrameBuilder::seated()
        .visibility(Keypoint::Nose, 0.3)
        .build()
}

/// Safe lift: upright back, deep squat, load at the belly
pub fn squat_lift() -> Frame {
    FrameBuilder::standing()
        .point(Keypoint::LeftKnee, 0.70, 0.70)
        .point(Keypoint::RightKnee, 0.30, 0.70)
        .wrists((0.55, 0.50), (0.45, 0.50))
        .build()
}

/// Unsafe lift: bent back, straight legs, arms reaching out
pub fn stoop_lift() -> Frame {
    FrameBuilder::standing()
        .shoulders(0.90, 0.80, 0.55)
        .wrists((0.95, 0.95), (0.90, 0.95))
        .build()
}

/// A frame that satisfies the given predicate once a baseline exists
pub fn satisfying(predicate: PredicateId) -> Frame {
    match predicate {
        PredicateId::CalibrationFit | PredicateId::StraightBack | PredicateId::Neutral => seated(),
        PredicateId::OpenPosture => arms_open(),
        PredicateId::Smile => smiling(),
        PredicateId::ArmsUp => arms_up(),
        PredicateId::HandsOnChest => hands_on_chest(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postura_core::{DeviceClass, LiftingThresholds, SessionTime, Thresholds};
    use postura_pose::{
        analyze_lifting_posture, detect_arms_up, detect_correct_positioning,
        detect_hands_on_chest, detect_neutral, detect_open_posture, detect_smile,
        detect_straight_back, BackMethod,
    };

    #[test]
    fn test_fixtures_are_complete() {
        for frame in [seated(), standing(), smiling(), arms_up(), squat_lift()] {
            assert!(frame.is_complete());
            assert!(frame.slots().iter().all(Option::is_some));
        }
    }

    #[test]
    fn test_satisfying_frames_satisfy() {
        let t = Thresholds::default();
        assert!(detect_correct_positioning(&satisfying(PredicateId::CalibrationFit), &t).achieved);
        assert!(detect_open_posture(&satisfying(PredicateId::OpenPosture), &t));
        assert!(detect_smile(&satisfying(PredicateId::Smile), &t));
        assert!(detect_arms_up(&satisfying(PredicateId::ArmsUp), &t));
        assert!(detect_hands_on_chest(&satisfying(PredicateId::HandsOnChest)));
        assert!(detect_neutral(&satisfying(PredicateId::Neutral)));

        let frame = satisfying(PredicateId::StraightBack);
        let first = detect_straight_back(&frame, &t, None, SessionTime::ZERO);
        assert!(!first.achieved);
        assert!(detect_straight_back(&frame, &t, first.baseline, SessionTime::ZERO).achieved);
    }

    #[test]
    fn test_negative_fixtures() {
        let t = Thresholds::default();
        assert!(!detect_correct_positioning(&off_center(), &t).achieved);
        assert!(!detect_smile(&seated(), &t));
        assert!(!detect_open_posture(&seated(), &t));
        assert!(!detect_arms_up(&arms_open(), &t));

        let baseline = detect_straight_back(&seated(), &t, None, SessionTime::ZERO).baseline;
        assert!(!detect_straight_back(&slouched(), &t, baseline, SessionTime::ZERO).achieved);
        assert!(!detect_straight_back(&tilted(), &t, baseline, SessionTime::ZERO).achieved);

        let leaning = detect_straight_back(&leaning(), &t, None, SessionTime::ZERO);
        assert_eq!(leaning.method, BackMethod::HipAlignment);
        assert!(!leaning.achieved);
        assert!(detect_straight_back(&standing(), &t, None, SessionTime::ZERO).achieved);
    }

    #[test]
    fn test_mobile_framing() {
        let frame = mobile_framed();
        assert!(!detect_correct_positioning(&frame, &Thresholds::default()).achieved);
        assert!(
            detect_correct_positioning(&frame, &Thresholds::for_device(DeviceClass::Mobile))
                .achieved
        );
    }

    #[test]
    fn test_lifting_fixtures() {
        let t = LiftingThresholds::default();
        assert!(analyze_lifting_posture(&squat_lift(), &t).unwrap().is_perfect);
        assert_eq!(analyze_lifting_posture(&stoop_lift(), &t).unwrap().score, 0);
    }
}
