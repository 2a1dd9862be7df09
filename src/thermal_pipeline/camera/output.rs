use std::time::SystemTime;

use image::{GrayImage, RgbImage};

use crate::thermal_pipeline::agc::Linear16;
use crate::thermal_pipeline::common::error::CameraError;
use crate::thermal_pipeline::temperature::TemperatureSample;

/// Everything one capture cycle produced, stamped once.
#[derive(Debug)]
pub struct CycleOutput {
    pub stamp: SystemTime,
    /// Driver frame counter of the dequeued buffer
    pub sequence: u32,
    pub frames: CycleFrames,
}

#[derive(Debug)]
pub enum CycleFrames {
    /// RAW16 without zoom.
    Radiometric(RadiometricFrames),
    /// RAW16 with zoom: only the resized 16-bit frame. The configured window
    /// is still checked so a bad one is reported.
    Zoomed {
        linear16: Linear16,
        scale_error: Option<CameraError>,
    },
    /// YUV: the luma plane as a grey frame.
    Luma { gray8: GrayImage },
}

#[derive(Debug)]
pub struct RadiometricFrames {
    pub linear16: Linear16,
    /// `None` when the configured window was rejected this cycle.
    pub scaled: Option<ScaledFrames>,
    pub temperatures: TemperatureSample,
    /// Why `scaled` is missing.
    pub scale_error: Option<CameraError>,
}

#[derive(Debug, Clone)]
pub struct ScaledFrames {
    pub linear8: GrayImage,
    pub normalized8: GrayImage,
    pub heatmap8: RgbImage,
    pub annotated8: RgbImage,
}

impl CycleOutput {
    pub fn temperatures(&self) -> Option<&TemperatureSample> {
        match &self.frames {
            CycleFrames::Radiometric(frames) => Some(&frames.temperatures),
            _ => None,
        }
    }

    pub fn scaled(&self) -> Option<&ScaledFrames> {
        match &self.frames {
            CycleFrames::Radiometric(frames) => frames.scaled.as_ref(),
            _ => None,
        }
    }

    /// Range error raised by this cycle's configured window, if any.
    pub fn scale_error(&self) -> Option<&CameraError> {
        match &self.frames {
            CycleFrames::Radiometric(frames) => frames.scale_error.as_ref(),
            CycleFrames::Zoomed { scale_error, .. } => scale_error.as_ref(),
            CycleFrames::Luma { .. } => None,
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self.frames {
            CycleFrames::Radiometric(_) => "radiometric",
            CycleFrames::Zoomed { .. } => "zoomed",
            CycleFrames::Luma { .. } => "luma",
        }
    }
}
