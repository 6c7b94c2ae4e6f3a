//! Detection thresholds and device classes
//!
//! All geometric cutoffs live here so the predicates never hardcode guide
//! geometry. Device class selects between the desktop and narrow-viewport
//! guide layouts.

use serde::{Deserialize, Serialize};

use crate::{PosturaError, PosturaResult};

/// Viewport width below which the narrow (mobile) layout applies
pub const MOBILE_VIEWPORT_MAX_WIDTH: u32 = 768;

/// Device class driving guide geometry and frame skipping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

impl DeviceClass {
    pub fn from_viewport_width(width: u32) -> Self {
        if width < MOBILE_VIEWPORT_MAX_WIDTH {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn is_mobile(self) -> bool {
        self == DeviceClass::Mobile
    }
}

/// On-screen calibration guides, in normalized frame units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideGeometry {
    /// Face guide centre Y
    pub face_y: f32,
    pub face_height: f32,
    /// Shoulder guide centre
    pub shoulder_x: f32,
    pub shoulder_y: f32,
    pub shoulder_width: f32,
    pub shoulder_height: f32,
    /// Slack added to every half-extent
    pub tolerance: f32,
}

impl Default for GuideGeometry {
    fn default() -> Self {
        Self::desktop()
    }
}

impl GuideGeometry {
    pub fn desktop() -> Self {
        GuideGeometry {
            face_y: 0.30,
            face_height: 0.15,
            shoulder_x: 0.50,
            shoulder_y: 0.66,
            shoulder_width: 0.50,
            shoulder_height: 0.10,
            tolerance: 0.15,
        }
    }

    /// Narrow viewport: the cropped video shifts the guides up and widens them
    pub fn mobile() -> Self {
        GuideGeometry {
            face_y: 0.05,
            face_height: 0.20,
            shoulder_x: 0.50,
            shoulder_y: 0.42,
            shoulder_width: 0.70,
            shoulder_height: 0.10,
            tolerance: 0.25,
        }
    }

    pub fn for_device(device: DeviceClass) -> Self {
        match device {
            DeviceClass::Desktop => Self::desktop(),
            DeviceClass::Mobile => Self::mobile(),
        }
    }
}

/// Cutoffs for the lifting-posture trainer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiftingThresholds {
    /// Back deviation from vertical, degrees
    pub straight_back_angle: f32,
    /// Mean knee angle, degrees
    pub knees_flexed_angle: f32,
    /// Mean wrist to torso-centre distance
    pub load_close_distance: f32,
}

impl Default for LiftingThresholds {
    fn default() -> Self {
        LiftingThresholds {
            straight_back_angle: 30.0,
            knees_flexed_angle: 140.0,
            load_close_distance: 0.25,
        }
    }
}

/// Every geometric threshold used by the pose predicates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// General visibility floor (wrists, baseline capture)
    pub visibility_min: f32,
    /// Loose floor used by calibration framing
    pub visibility_min_loose: f32,
    /// Floor for hips/shoulders/nose in the straight-back check
    pub back_visibility_min: f32,
    /// Nose visibility under which the lighting warning shows
    pub lighting_visibility_min: f32,

    pub guides: GuideGeometry,
    pub min_shoulder_width: f32,
    pub max_shoulder_width: f32,

    pub shoulder_level_tolerance: f32,
    pub back_max_horizontal_offset: f32,
    pub back_max_vertical_angle: f32,
    pub slouch_max_shoulder_drop: f32,
    pub slouch_max_nose_drop: f32,

    /// Wrist spread as a fraction of shoulder width
    pub open_posture_spread_ratio: f32,
    /// How far below its shoulder a wrist may hang in an open posture
    pub open_posture_max_wrist_drop: f32,
    pub arms_up_margin: f32,

    pub smile_min_width_ratio: f32,
    pub smile_max_elevation: f32,

    pub lifting: LiftingThresholds,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::for_device(DeviceClass::Desktop)
    }
}

impl Thresholds {
    pub fn for_device(device: DeviceClass) -> Self {
        Thresholds {
            visibility_min: 0.5,
            visibility_min_loose: 0.15,
            back_visibility_min: 0.4,
            lighting_visibility_min: 0.4,
            guides: GuideGeometry::for_device(device),
            min_shoulder_width: 0.10,
            max_shoulder_width: 0.65,
            shoulder_level_tolerance: 0.04,
            back_max_horizontal_offset: 0.08,
            back_max_vertical_angle: 15.0,
            slouch_max_shoulder_drop: 0.05,
            slouch_max_nose_drop: 0.06,
            open_posture_spread_ratio: 0.5,
            open_posture_max_wrist_drop: 0.25,
            arms_up_margin: 0.1,
            smile_min_width_ratio: 0.50,
            smile_max_elevation: 0.15,
            lifting: LiftingThresholds::default(),
        }
    }

    /// Reject values that would make predicates meaningless
    pub fn validate(&self) -> PosturaResult<()> {
        let unit = [
            ("visibility_min", self.visibility_min),
            ("visibility_min_loose", self.visibility_min_loose),
            ("back_visibility_min", self.back_visibility_min),
            ("lighting_visibility_min", self.lighting_visibility_min),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(PosturaError::ThresholdOutOfRange { name, value });
            }
        }

        let positive = [
            ("guides.face_height", self.guides.face_height),
            ("guides.shoulder_width", self.guides.shoulder_width),
            ("guides.shoulder_height", self.guides.shoulder_height),
            ("shoulder_level_tolerance", self.shoulder_level_tolerance),
            ("back_max_horizontal_offset", self.back_max_horizontal_offset),
            ("back_max_vertical_angle", self.back_max_vertical_angle),
            ("smile_min_width_ratio", self.smile_min_width_ratio),
            ("lifting.load_close_distance", self.lifting.load_close_distance),
        ];
        for (name, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(PosturaError::ThresholdOutOfRange { name, value });
            }
        }

        if self.guides.tolerance < 0.0 {
            return Err(PosturaError::ThresholdOutOfRange {
                name: "guides.tolerance",
                value: self.guides.tolerance,
            });
        }
        if self.min_shoulder_width >= self.max_shoulder_width {
            return Err(PosturaError::ThresholdOutOfRange {
                name: "min_shoulder_width",
                value: self.min_shoulder_width,
            });
        }
        Ok(())
    }
}
