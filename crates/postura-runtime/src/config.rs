//! Runtime configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use postura_core::{DeviceClass, PosturaError, PosturaResult, Thresholds};
use postura_experience::{PhaseTable, DEFAULT_MAX_FRAME_INTERVAL};
use postura_pose::SMOOTHING_FRAMES;

use crate::telemetry::LogFormat;

/// Process every 2nd captured frame on desktops
pub const DESKTOP_FRAME_STRIDE: u32 = 2;
/// Process every 3rd captured frame on mobile
pub const MOBILE_FRAME_STRIDE: u32 = 3;

/// Everything needed to start a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub device: DeviceClass,
    /// Overrides the device default stride
    pub frame_stride: Option<u32>,
    pub smoothing_window: usize,
    /// Longest frame gap credited when a hold starts
    pub max_frame_interval_ms: u64,
    pub log_format: LogFormat,
    /// Score lifting posture on every smoothed frame
    pub lifting_trainer: bool,
    /// Overrides the device default thresholds
    pub thresholds: Option<Thresholds>,
    /// JSON phase table; the built-in script when unset
    pub phases_path: Option<PathBuf>,
    /// Overrides automatic model selection
    pub model: Option<ModelVariant>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            device: DeviceClass::Desktop,
            frame_stride: None,
            smoothing_window: SMOOTHING_FRAMES,
            max_frame_interval_ms: DEFAULT_MAX_FRAME_INTERVAL.as_millis() as u64,
            log_format: LogFormat::Pretty,
            lifting_trainer: false,
            thresholds: None,
            phases_path: None,
            model: None,
        }
    }
}

impl RuntimeConfig {
    pub fn for_device(device: DeviceClass) -> Self {
        RuntimeConfig {
            device,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> PosturaResult<Self> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> PosturaResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> PosturaResult<()> {
        if self.frame_stride == Some(0) {
            return Err(PosturaError::Config("frame_stride must be at least 1".into()));
        }
        if self.smoothing_window == 0 {
            return Err(PosturaError::Config(
                "smoothing_window must be at least 1".into(),
            ));
        }
        self.thresholds().validate()
    }

    /// Captured frames per processed frame
    pub fn frame_stride(&self) -> u32 {
        self.frame_stride.unwrap_or(match self.device {
            DeviceClass::Desktop => DESKTOP_FRAME_STRIDE,
            DeviceClass::Mobile => MOBILE_FRAME_STRIDE,
        })
    }

    pub fn max_frame_interval(&self) -> Duration {
        Duration::from_millis(self.max_frame_interval_ms)
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
            .unwrap_or_else(|| Thresholds::for_device(self.device))
    }

    pub fn phase_table(&self) -> PosturaResult<PhaseTable> {
        match &self.phases_path {
            Some(path) => PhaseTable::from_json_file(path),
            None => Ok(PhaseTable::default_script()),
        }
    }

    pub fn model_variant(&self, profile: &DeviceProfile) -> ModelVariant {
        self.model.unwrap_or_else(|| ModelVariant::select(profile))
    }
}

/// What the host machine can afford
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub is_mobile: bool,
    pub cores: usize,
    pub memory_gb: f32,
}

impl DeviceProfile {
    /// Assumed when the platform does not report a value
    pub const FALLBACK_CORES: usize = 4;
    pub const FALLBACK_MEMORY_GB: f32 = 4.0;

    /// Probe the current host; memory is not probed and uses the fallback
    pub fn detect(device: DeviceClass) -> Self {
        DeviceProfile {
            is_mobile: device.is_mobile(),
            cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(Self::FALLBACK_CORES),
            memory_gb: Self::FALLBACK_MEMORY_GB,
        }
    }
}

/// Pose-detector model size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    Full,
    Lite,
}

impl ModelVariant {
    /// Full model only for capable desktops
    pub fn select(profile: &DeviceProfile) -> Self {
        if profile.is_mobile {
            return ModelVariant::Lite;
        }
        let strong = profile.cores >= 8 && profile.memory_gb >= 8.0;
        let decent = profile.cores >= 6 && profile.memory_gb >= 6.0;
        if strong || decent {
            ModelVariant::Full
        } else {
            ModelVariant::Lite
        }
    }

    pub fn asset_name(self) -> &'static str {
        match self {
            ModelVariant::Full => "pose_landmarker_full.task",
            ModelVariant::Lite => "pose_landmarker_lite.task",
        }
    }
}
