use crate::thermal_pipeline::common::error::{CameraError, Result};
use crate::thermal_pipeline::device::types::{FrameGeometry, PixelFormat};

/// Rebuilds a radiometric count from its two bytes.
#[inline]
pub fn combine_bytes(high: u8, low: u8) -> u16 {
    (u16::from(high) << 8) | u16::from(low)
}

/// Read-only view of the mapped capture buffer.
///
/// Borrows the buffer, so it cannot outlive the cycle that dequeued it:
/// the next `QBUF` needs the capture loop mutably.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    data: &'a [u8],
    geometry: FrameGeometry,
    format: PixelFormat,
    sequence: u32,
}

impl<'a> RawFrame<'a> {
    /// Wraps `data`, which must hold at least one full frame; extra bytes
    /// (driver padding) are ignored.
    pub fn new(data: &'a [u8], geometry: FrameGeometry, format: PixelFormat) -> Result<Self> {
        let needed = format.frame_len(geometry);
        if geometry.pixel_count() == 0 {
            return Err(CameraError::InvalidFrame(format!("empty {geometry} frame")));
        }
        if data.len() < needed {
            return Err(CameraError::InvalidFrame(format!(
                "{} {} frame needs {needed} bytes, buffer holds {}",
                geometry,
                format,
                data.len()
            )));
        }
        Ok(Self {
            data: &data[..needed],
            geometry,
            format,
            sequence: 0,
        })
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Driver frame counter, 0 for frames built outside a capture.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Counts in row-major order. Only meaningful for `Y16` frames.
    pub fn counts(&self) -> impl Iterator<Item = u16> + 'a {
        self.data
            .chunks_exact(2)
            .map(|pair| combine_bytes(pair[1], pair[0]))
    }

    /// Count at column `x`, row `y`, or `None` outside the frame.
    pub fn count(&self, x: usize, y: usize) -> Option<u16> {
        if self.format != PixelFormat::Y16 || x >= self.width() || y >= self.height() {
            return None;
        }
        let at = (y * self.width() + x) * 2;
        Some(combine_bytes(self.data[at + 1], self.data[at]))
    }

    /// The full-resolution luma plane of a planar 4:2:0 frame.
    pub fn luma(&self) -> Option<&'a [u8]> {
        match self.format {
            PixelFormat::Yvu420 => Some(&self.data[..self.geometry.pixel_count()]),
            PixelFormat::Y16 => None,
        }
    }
}
