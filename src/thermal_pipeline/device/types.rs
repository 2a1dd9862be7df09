//! Types exchanged with the capture device

use std::fmt;

/// Pixel layouts the Boson exposes over UVC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One little-endian 16-bit radiometric count per pixel
    Y16,
    /// Planar 4:2:0, full luma plane followed by Cr and Cb planes
    Yvu420,
}

impl PixelFormat {
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            PixelFormat::Y16 => *b"Y16 ",
            PixelFormat::Yvu420 => *b"YV12",
        }
    }

    pub fn from_fourcc(code: [u8; 4]) -> Option<Self> {
        match &code {
            b"Y16 " => Some(PixelFormat::Y16),
            b"YV12" => Some(PixelFormat::Yvu420),
            _ => None,
        }
    }

    /// Bytes needed for a full frame of the given size.
    pub fn frame_len(self, geometry: FrameGeometry) -> usize {
        let pixels = geometry.pixel_count();
        match self {
            PixelFormat::Y16 => pixels * 2,
            PixelFormat::Yvu420 => pixels + pixels / 2,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.fourcc();
        write!(f, "{}", String::from_utf8_lossy(&code).trim_end())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: usize,
    pub height: usize,
}

impl FrameGeometry {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }
}

impl fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Format asked of the device with `VIDIOC_S_FMT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRequest {
    pub pixel_format: PixelFormat,
    pub geometry: FrameGeometry,
}

/// What `VIDIOC_S_FMT` wrote back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub fourcc: [u8; 4],
    pub geometry: FrameGeometry,
    pub size_image: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub driver: String,
    pub card: String,
    pub video_capture: bool,
    pub streaming: bool,
}

/// Kernel description of the mmap buffer returned by `VIDIOC_QUERYBUF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub index: u32,
    pub length: usize,
    pub offset: u32,
}

/// Result of a completed `VIDIOC_DQBUF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DequeuedBuffer {
    pub index: u32,
    pub bytes_used: usize,
    pub sequence: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Closed,
    Configured,
    Streaming,
}

impl DeviceState {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceState::Closed => "closed",
            DeviceState::Configured => "configured",
            DeviceState::Streaming => "streaming",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
