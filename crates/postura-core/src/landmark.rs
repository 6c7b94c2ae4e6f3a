//! Landmarks and frames
//!
//! A frame is what the external tracker reports for one person at one
//! instant: up to 33 keypoints in a fixed order. Index meaning is a contract;
//! the tracker may omit entries, so every slot is optional.

use serde::{Deserialize, Serialize};

use crate::{PosturaError, PosturaResult};

/// Body keypoint identifier, in tracker order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keypoint {
    // Face
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,

    // Upper body
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,

    // Lower body
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl Keypoint {
    /// Number of keypoints in a complete frame
    pub const COUNT: usize = 33;

    /// All keypoints in order
    pub fn all() -> &'static [Keypoint] {
        &[
            Keypoint::Nose,
            Keypoint::LeftEyeInner,
            Keypoint::LeftEye,
            Keypoint::LeftEyeOuter,
            Keypoint::RightEyeInner,
            Keypoint::RightEye,
            Keypoint::RightEyeOuter,
            Keypoint::LeftEar,
            Keypoint::RightEar,
            Keypoint::MouthLeft,
            Keypoint::MouthRight,
            Keypoint::LeftShoulder,
            Keypoint::RightShoulder,
            Keypoint::LeftElbow,
            Keypoint::RightElbow,
            Keypoint::LeftWrist,
            Keypoint::RightWrist,
            Keypoint::LeftPinky,
            Keypoint::RightPinky,
            Keypoint::LeftIndex,
            Keypoint::RightIndex,
            Keypoint::LeftThumb,
            Keypoint::RightThumb,
            Keypoint::LeftHip,
            Keypoint::RightHip,
            Keypoint::LeftKnee,
            Keypoint::RightKnee,
            Keypoint::LeftAnkle,
            Keypoint::RightAnkle,
            Keypoint::LeftHeel,
            Keypoint::RightHeel,
            Keypoint::LeftFootIndex,
            Keypoint::RightFootIndex,
        ]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Keypoint> {
        Self::all().get(index).copied()
    }
}

fn default_visibility() -> f32 {
    1.0
}

/// Normalized body keypoint
///
/// x/y are relative to the video frame (roughly [0,1]), z is relative depth.
/// Trackers that omit z or visibility are read as z = 0 and fully visible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default = "default_visibility")]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// Fully visible point on the image plane
    pub fn at(x: f32, y: f32) -> Self {
        Self::new(x, y, 0.0, 1.0)
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = visibility;
        self
    }
}

/// One tracked person at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame {
    landmarks: Vec<Option<Landmark>>,
}

impl Frame {
    /// Frame from raw tracker slots
    pub fn new(landmarks: Vec<Option<Landmark>>) -> Self {
        Self { landmarks }
    }

    /// Frame from raw slots, rejecting more than [`Keypoint::COUNT`] entries
    pub fn try_new(landmarks: Vec<Option<Landmark>>) -> PosturaResult<Self> {
        if landmarks.len() > Keypoint::COUNT {
            return Err(PosturaError::FrameTooLong {
                expected: Keypoint::COUNT,
                actual: landmarks.len(),
            });
        }
        Ok(Self::new(landmarks))
    }

    /// Frame where every slot is present
    pub fn from_landmarks(landmarks: Vec<Landmark>) -> Self {
        Self::new(landmarks.into_iter().map(Some).collect())
    }

    /// Empty frame with all 33 slots absent
    pub fn empty() -> Self {
        Self::new(vec![None; Keypoint::COUNT])
    }

    #[inline]
    pub fn get(&self, keypoint: Keypoint) -> Option<&Landmark> {
        self.get_index(keypoint.index())
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index).and_then(Option::as_ref)
    }

    /// Set a keypoint, growing the frame if needed
    pub fn set(&mut self, keypoint: Keypoint, landmark: Landmark) {
        let idx = keypoint.index();
        if idx >= self.landmarks.len() {
            self.landmarks.resize(idx + 1, None);
        }
        self.landmarks[idx] = Some(landmark);
    }

    /// Mark a keypoint as not reported
    pub fn clear(&mut self, keypoint: Keypoint) {
        if let Some(slot) = self.landmarks.get_mut(keypoint.index()) {
            *slot = None;
        }
    }

    /// Number of slots (present or absent)
    #[inline]
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Has all 33 slots
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= Keypoint::COUNT
    }

    pub fn slots(&self) -> &[Option<Landmark>] {
        &self.landmarks
    }

    /// Mean visibility over present landmarks, 0 for an empty frame
    pub fn mean_visibility(&self) -> f32 {
        let (sum, count) = self
            .landmarks
            .iter()
            .flatten()
            .fold((0.0f32, 0usize), |(s, n), lm| (s + lm.visibility, n + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}

impl FromIterator<Option<Landmark>> for Frame {
    fn from_iter<I: IntoIterator<Item = Option<Landmark>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_order() {
        assert_eq!(Keypoint::all().len(), Keypoint::COUNT);
        for (i, kp) in Keypoint::all().iter().enumerate() {
            assert_eq!(kp.index(), i);
        }
        assert_eq!(Keypoint::from_index(11), Some(Keypoint::LeftShoulder));
        assert_eq!(Keypoint::from_index(33), None);
    }

    #[test]
    fn test_landmark_defaults_from_json() {
        let lm: Landmark = serde_json::from_str(r#"{"x":0.5,"y":0.25}"#).unwrap();
        assert_eq!(lm.z, 0.0);
        assert_eq!(lm.visibility, 1.0);
    }

    #[test]
    fn test_frame_json_with_gaps() {
        let frame: Frame =
            serde_json::from_str(r#"[{"x":0.5,"y":0.2,"visibility":0.9}, null]"#).unwrap();
        assert_eq!(frame.len(), 2);
        assert!(frame.get(Keypoint::Nose).is_some());
        assert!(frame.get(Keypoint::LeftEyeInner).is_none());
        assert!(!frame.is_complete());
    }

    #[test]
    fn test_frame_set_grows() {
        let mut frame = Frame::default();
        frame.set(Keypoint::RightShoulder, Landmark::at(0.4, 0.6));
        assert_eq!(frame.len(), 13);
        assert!(frame.get(Keypoint::LeftShoulder).is_none());

        frame.clear(Keypoint::RightShoulder);
        assert!(frame.get(Keypoint::RightShoulder).is_none());
    }

    #[test]
    fn test_frame_rejects_extra_slots() {
        let err = Frame::try_new(vec![None; 34]).unwrap_err();
        assert!(matches!(err, PosturaError::FrameTooLong { actual: 34, .. }));
        assert!(Frame::try_new(vec![None; 33]).is_ok());
    }

    #[test]
    fn test_mean_visibility() {
        let frame = Frame::from_landmarks(vec![
            Landmark::at(0.0, 0.0).with_visibility(0.2),
            Landmark::at(0.0, 0.0).with_visibility(0.6),
        ]);
        assert!((frame.mean_visibility() - 0.4).abs() < 1e-6);
        assert_eq!(Frame::empty().mean_visibility(), 0.0);
    }
}
