//! Start-up settings for the camera service
//!
//! Settings come from an optional TOML file; every field has a default so
//! an empty file (or no file at all) describes a Boson 640 on `/dev/video0`
//! streaming RAW16 at 60 Hz.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::thermal_pipeline::common::error::{CameraError, Result};
use crate::thermal_pipeline::config::agc::AgcConfig;
use crate::thermal_pipeline::device::types::{FrameGeometry, PixelFormat};

/// Geometry of the YUV stream, independent of the sensor variant.
pub const YUV_GEOMETRY: FrameGeometry = FrameGeometry::new(640, 512);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum VideoMode {
    Raw16,
    Yuv,
}

impl VideoMode {
    pub fn pixel_format(self) -> PixelFormat {
        match self {
            VideoMode::Raw16 => PixelFormat::Y16,
            VideoMode::Yuv => PixelFormat::Yvu420,
        }
    }
}

impl FromStr for VideoMode {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RAW16" => Ok(VideoMode::Raw16),
            "YUV" => Ok(VideoMode::Yuv),
            other => Err(CameraError::InvalidSetting {
                name: "video_mode",
                reason: format!("expected RAW16 or YUV, got {other:?}"),
            }),
        }
    }
}

impl TryFrom<String> for VideoMode {
    type Error = CameraError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoMode::Raw16 => f.write_str("RAW16"),
            VideoMode::Yuv => f.write_str("YUV"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SensorType {
    Boson320,
    Boson640,
}

impl SensorType {
    /// Native RAW16 resolution of the sensor.
    pub fn raw16_geometry(self) -> FrameGeometry {
        match self {
            SensorType::Boson320 => FrameGeometry::new(320, 256),
            SensorType::Boson640 => FrameGeometry::new(640, 512),
        }
    }

    pub fn camera_name(self) -> &'static str {
        match self {
            SensorType::Boson320 => "Boson320",
            SensorType::Boson640 => "Boson640",
        }
    }
}

impl FromStr for SensorType {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("Boson_320") {
            Ok(SensorType::Boson320)
        } else if s.eq_ignore_ascii_case("Boson_640") {
            Ok(SensorType::Boson640)
        } else {
            Err(CameraError::InvalidSetting {
                name: "sensor_type",
                reason: format!("expected Boson_320 or Boson_640, got {s:?}"),
            })
        }
    }
}

impl TryFrom<String> for SensorType {
    type Error = CameraError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorType::Boson320 => f.write_str("Boson_320"),
            SensorType::Boson640 => f.write_str("Boson_640"),
        }
    }
}

/// Frame size requested for a mode/sensor combination.
pub fn stream_geometry(mode: VideoMode, sensor: SensorType) -> FrameGeometry {
    match mode {
        VideoMode::Raw16 => sensor.raw16_geometry(),
        VideoMode::Yuv => YUV_GEOMETRY,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Coordinate frame name attached to every output
    pub frame_id: String,
    /// Video device node
    pub dev: PathBuf,
    /// Capture trigger rate in Hz
    pub frame_rate: f64,
    pub video_mode: VideoMode,
    /// Publish only an upscaled 16-bit frame in RAW16 mode
    pub zoom_enable: bool,
    pub sensor_type: SensorType,
    /// Calibration file location handed to the camera-info provider
    pub camera_info_url: String,
    /// Bound on the blocking dequeue; `None` waits forever
    pub capture_timeout_ms: Option<u64>,
    /// Initial runtime AGC configuration
    pub agc: AgcConfig,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            frame_id: "boson_camera".to_string(),
            dev: PathBuf::from("/dev/video0"),
            frame_rate: 60.0,
            video_mode: VideoMode::Raw16,
            zoom_enable: false,
            sensor_type: SensorType::Boson640,
            camera_info_url: String::new(),
            capture_timeout_ms: None,
            agc: AgcConfig::default(),
        }
    }
}

impl CameraSettings {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CameraError::Settings(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
            .map_err(|e| CameraError::Settings(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(text).map_err(|e| CameraError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(CameraError::InvalidSetting {
                name: "frame_rate",
                reason: format!("must be a positive number of Hz, got {}", self.frame_rate),
            });
        }
        if Duration::try_from_secs_f64(1.0 / self.frame_rate).is_err() {
            return Err(CameraError::InvalidSetting {
                name: "frame_rate",
                reason: format!("period of {} Hz is not representable", self.frame_rate),
            });
        }
        if self.capture_timeout_ms == Some(0) {
            return Err(CameraError::InvalidSetting {
                name: "capture_timeout_ms",
                reason: "must be greater than zero when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn geometry(&self) -> FrameGeometry {
        stream_geometry(self.video_mode, self.sensor_type)
    }

    /// Trigger period. Saturates for rates `validate` would reject.
    pub fn frame_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.frame_rate).unwrap_or(Duration::MAX)
    }

    pub fn capture_timeout(&self) -> Option<Duration> {
        self.capture_timeout_ms.map(Duration::from_millis)
    }
}
