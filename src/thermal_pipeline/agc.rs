//! Automatic gain control
//!
//! Maps radiometric counts to displayable 8-bit frames, plus the helpers
//! that derive the other per-cycle frames from the same data.

mod normalize;
mod resample;
mod transform;

pub use normalize::normalize;
pub use resample::{ZOOM_GEOMETRY, luma_frame, zoom};
pub use transform::{AgcTransform, CountWindow, Linear16, ScanPass};
