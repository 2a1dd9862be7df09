//! Thermal capture pipeline
//!
//! This module drives a radiometric thermal sensor exposed as a V4L2 capture
//! device, with separate modules for device bring-up, per-trigger capture,
//! automatic gain control, temperature sampling, rendering and publishing.

pub mod agc;
pub mod camera;
pub mod capture;
pub mod common;
pub mod config;
pub mod device;
pub mod publish;
pub mod render;
pub mod temperature;

pub use common::{CameraError, CycleTimings, Result};

pub use config::{AgcConfig, AgcConfigBuilder, CameraSettings, ConfigStore, SensorType, VideoMode};

pub use device::{
    DeviceController, DeviceState, FrameGeometry, PixelFormat, SimulatedBackend, V4l2Backend,
    VideoBackend,
};

pub use capture::{CaptureLoop, RawFrame};

pub use agc::{AgcTransform, Linear16, ScanPass};

pub use temperature::{TemperatureSample, TemperatureSampler};

pub use render::{OverlayVisualizer, Visualizer};

pub use publish::{CameraInfo, FrameSink, TracingSink};

pub use camera::{ConfigHandle, CycleFrames, CycleOutput, ThermalCamera};
