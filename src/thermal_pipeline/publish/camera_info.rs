use tracing::info;

use crate::thermal_pipeline::config::CameraSettings;
use crate::thermal_pipeline::device::FrameGeometry;

const CALIBRATION_SCHEMES: [&str; 2] = ["file://", "package://"];

/// Metadata sent alongside every frame. Loading the calibration behind
/// `calibration_url` is left to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraInfo {
    pub camera_name: String,
    pub frame_id: String,
    pub calibration_url: Option<String>,
    pub width: usize,
    pub height: usize,
}

impl CameraInfo {
    pub fn from_settings(settings: &CameraSettings, geometry: FrameGeometry) -> Self {
        let url = settings.camera_info_url.trim();
        let calibration_url = if is_calibration_url(url) {
            info!(url, "Camera calibration URL accepted");
            Some(url.to_string())
        } else {
            info!(url, "Invalid camera info URL, publishing uncalibrated");
            None
        };
        Self {
            camera_name: settings.sensor_type.camera_name().to_string(),
            frame_id: settings.frame_id.clone(),
            calibration_url,
            width: geometry.width,
            height: geometry.height,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration_url.is_some()
    }
}

pub fn is_calibration_url(url: &str) -> bool {
    CALIBRATION_SCHEMES
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}
