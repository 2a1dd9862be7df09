//! Temperature readings derived from radiometric counts

mod convert;
mod sampler;

pub use convert::{COUNTS_PER_KELVIN, KELVIN_OFFSET, celsius_to_count, count_to_celsius};
pub use sampler::{TemperatureSample, TemperatureSampler};
