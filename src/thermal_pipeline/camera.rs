//! Capture cycle orchestration
//!
//! [`ThermalCamera`] owns the streaming device and runs one full cycle per
//! trigger. It is generic over the device backend, the renderer and the
//! sink so each can be replaced in tests.

mod output;
mod reconfigure;
mod thermal_camera;
mod throttle;

#[cfg(test)]
mod tests;

pub use output::{CycleFrames, CycleOutput, RadiometricFrames, ScaledFrames};
pub use reconfigure::{ConfigHandle, validate_config};
pub use thermal_camera::ThermalCamera;
pub use throttle::LogThrottle;
