use image::GrayImage;
use image::imageops::{self, FilterType};

use crate::thermal_pipeline::agc::transform::Linear16;
use crate::thermal_pipeline::capture::RawFrame;
use crate::thermal_pipeline::common::error::{CameraError, Result};
use crate::thermal_pipeline::device::FrameGeometry;

/// Output size of the zoomed 16-bit frame.
pub const ZOOM_GEOMETRY: FrameGeometry = FrameGeometry::new(640, 512);

/// Bilinear resize of the 16-bit frame to `target`.
pub fn zoom(linear16: &Linear16, target: FrameGeometry) -> Linear16 {
    let (width, height) = (target.width as u32, target.height as u32);
    if linear16.dimensions() == (width, height) {
        return linear16.clone();
    }
    imageops::resize(linear16, width, height, FilterType::Triangle)
}

/// Grey image made of the luma plane of a planar 4:2:0 frame.
pub fn luma_frame(frame: &RawFrame<'_>) -> Result<GrayImage> {
    let plane = frame.luma().ok_or_else(|| {
        CameraError::InvalidFrame(format!("{} frame has no luma plane", frame.format()))
    })?;
    GrayImage::from_raw(frame.width() as u32, frame.height() as u32, plane.to_vec())
        .ok_or_else(|| CameraError::InvalidFrame(format!("short {} luma plane", frame.geometry())))
}
