//! Per-trigger frame acquisition

mod capture_loop;
mod frame;


pub use capture_loop::CaptureLoop;
pub use frame::{RawFrame, combine_bytes};
