//! Hand-off of cycle outputs to consumers

mod camera_info;
mod sink;

pub use camera_info::{CameraInfo, is_calibration_url};
pub use sink::{FrameSink, TracingSink};
