use std::cmp::Ordering;

use image::{GrayImage, ImageBuffer, Luma};

use crate::thermal_pipeline::capture::RawFrame;
use crate::thermal_pipeline::common::error::{CameraError, Result};
use crate::thermal_pipeline::config::AgcConfig;
use crate::thermal_pipeline::device::PixelFormat;
use crate::thermal_pipeline::temperature::{celsius_to_count, count_to_celsius};

/// Full-resolution frame of unclamped radiometric counts.
pub type Linear16 = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Result of the scan pass: the observed count range and the copied counts.
#[derive(Debug, Clone)]
pub struct ScanPass {
    pub min_count: u16,
    pub max_count: u16,
    pub linear16: Linear16,
}

impl ScanPass {
    pub fn max_temp(&self) -> f64 {
        count_to_celsius(self.max_count)
    }

    pub fn min_temp(&self) -> f64 {
        count_to_celsius(self.min_count)
    }
}

/// Configured temperature limits expressed as counts, `min < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountWindow {
    min: u32,
    max: u32,
}

impl CountWindow {
    pub fn from_limits(config: &AgcConfig) -> Result<Self> {
        let (max_limit, min_limit) = (config.max_temp_limit, config.min_temp_limit);
        // NaN limits compare as unordered and are refused too.
        if max_limit.partial_cmp(&min_limit) != Some(Ordering::Greater) {
            return Err(CameraError::ConfigRange {
                max_temp_limit: max_limit,
                min_temp_limit: min_limit,
            });
        }
        let min = celsius_to_count(min_limit);
        let max = celsius_to_count(max_limit);
        if max <= min {
            return Err(CameraError::DegenerateRange(min));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// `floor(255 * (clamp(count) - min) / (max - min))` in integers.
    #[inline]
    pub fn scale(&self, count: u16) -> u8 {
        let (min, max) = (u64::from(self.min), u64::from(self.max));
        let clamped = u64::from(count).clamp(min, max);
        (255 * (clamped - min) / (max - min)) as u8
    }
}

/// Linear automatic gain control over RAW16 frames.
///
/// Two passes: [`scan`](Self::scan) finds the observed range and copies the
/// counts out of the device buffer, [`scale`](Self::scale) maps them into
/// 0-255 through the configured temperature window.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgcTransform;

impl AgcTransform {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, frame: &RawFrame<'_>) -> Result<ScanPass> {
        if frame.format() != PixelFormat::Y16 {
            return Err(CameraError::InvalidFrame(format!(
                "AGC needs Y16 counts, got {}",
                frame.format()
            )));
        }

        let mut min_count = u16::MAX;
        let mut max_count = u16::MIN;
        let mut counts = Vec::with_capacity(frame.geometry().pixel_count());
        for count in frame.counts() {
            min_count = min_count.min(count);
            max_count = max_count.max(count);
            counts.push(count);
        }

        let linear16 = Linear16::from_raw(frame.width() as u32, frame.height() as u32, counts)
            .ok_or_else(|| {
                CameraError::InvalidFrame(format!(
                    "{} counts do not fill the frame",
                    frame.geometry()
                ))
            })?;

        Ok(ScanPass {
            min_count,
            max_count,
            linear16,
        })
    }

    /// Fails with `ConfigRange`/`DegenerateRange` before touching any pixel.
    pub fn scale(&self, linear16: &Linear16, config: &AgcConfig) -> Result<GrayImage> {
        let window = CountWindow::from_limits(config)?;
        Ok(self.scale_with(linear16, window))
    }

    pub fn scale_with(&self, linear16: &Linear16, window: CountWindow) -> GrayImage {
        let (width, height) = linear16.dimensions();
        let mut linear8 = GrayImage::new(width, height);
        for (dst, src) in linear8.pixels_mut().zip(linear16.pixels()) {
            dst.0[0] = window.scale(src.0[0]);
        }
        linear8
    }
}
