//! Configuration module
//!
//! Start-up settings plus the live AGC configuration shared between the
//! capture context and the reconfiguration context.

pub mod agc;
pub mod settings;
mod store;

pub use agc::{AgcConfig, AgcConfigBuilder};
pub use settings::{CameraSettings, SensorType, VideoMode, YUV_GEOMETRY, stream_geometry};
pub use store::ConfigStore;
