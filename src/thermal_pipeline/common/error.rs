use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open video device {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Video capture capability check failed: {0}")]
    Capability(String),

    #[error("The device rejected the requested video format: {0}")]
    FormatNegotiation(String),

    #[error("The device failed to allocate a capture buffer: {0}")]
    BufferAllocation(String),

    #[error("Failed to memory-map the capture buffer: {0}")]
    MemoryMap(String),

    #[error("{ioctl} failed: {source}")]
    StreamControl {
        ioctl: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Capture cycle abandoned, {ioctl} failed: {source}")]
    CaptureCycle {
        ioctl: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("No frame was delivered within {0:?}")]
    CaptureTimeout(std::time::Duration),

    #[error(
        "max_temp_limit should be larger than min_temp_limit (max_temp_limit: {max_temp_limit}, min_temp_limit: {min_temp_limit})"
    )]
    ConfigRange {
        max_temp_limit: f64,
        min_temp_limit: f64,
    },

    #[error("Temperature limits collapse to a single raw count ({0})")]
    DegenerateRange(u32),

    #[error("Pointer ({x}, {y}) lies outside the {width}x{height} frame")]
    PointerOutOfRange {
        x: i32,
        y: i32,
        width: usize,
        height: usize,
    },

    #[error("Operation requires the device to be {expected}, but it is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("Failed to load settings: {0}")]
    Settings(String),
}

impl CameraError {
    /// Errors raised while bringing the device up. Recovering from these
    /// needs a fresh controller; everything else only costs one cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CameraError::DeviceOpen { .. }
                | CameraError::Capability(_)
                | CameraError::FormatNegotiation(_)
                | CameraError::BufferAllocation(_)
                | CameraError::MemoryMap(_)
                | CameraError::StreamControl { .. }
        )
    }

    /// True for the two errors that skip only the AGC scale pass.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            CameraError::ConfigRange { .. } | CameraError::DegenerateRange(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CameraError>;
