//! Common utilities module
//!
//! This module contains the error taxonomy and timing helpers shared across the pipeline.

pub mod error;
pub mod timing;

pub use error::{CameraError, Result};
pub use timing::{CycleTimings, StageTiming, Timer};
