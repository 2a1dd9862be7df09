//! Capture device access
//!
//! The kernel protocol sits behind the [`VideoBackend`] trait so the
//! bring-up state machine can run against real hardware or a simulation.

mod backend;
mod controller;
mod simulated;
pub mod types;
mod v4l2_backend;

#[cfg(test)]
mod tests;

pub use backend::VideoBackend;
pub use controller::{ActiveFormat, BUFFER_INDEX, DeviceController};
pub use simulated::{Ioctl, SimulatedBackend, SimulatedHandle, encode_raw16};
pub use types::{
    BufferInfo, DequeuedBuffer, DeviceCapabilities, DeviceState, FormatRequest, FrameGeometry,
    NegotiatedFormat, PixelFormat,
};
pub use v4l2_backend::V4l2Backend;
