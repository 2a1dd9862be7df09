use crate::thermal_pipeline::agc::{Linear16, ScanPass};
use crate::thermal_pipeline::common::error::{CameraError, Result};
use crate::thermal_pipeline::config::AgcConfig;
use crate::thermal_pipeline::temperature::convert::count_to_celsius;

/// Scalar readings of one cycle, in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureSample {
    pub max_temp: f64,
    pub min_temp: f64,
    pub ptr_temp: f64,
}

/// Reads the pointer pixel out of the 16-bit linear frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemperatureSampler;

impl TemperatureSampler {
    pub fn new() -> Self {
        Self
    }

    /// Temperature under (`point_x`, `point_y`) of `config`.
    pub fn pointer_temperature(&self, linear16: &Linear16, config: &AgcConfig) -> Result<f64> {
        let (x, y) = (config.point_x, config.point_y);
        let (width, height) = linear16.dimensions();
        if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
            return Err(CameraError::PointerOutOfRange {
                x,
                y,
                width: width as usize,
                height: height as usize,
            });
        }
        let count = linear16.get_pixel(x as u32, y as u32).0[0];
        Ok(count_to_celsius(count))
    }

    /// Max/min from the scan pass plus the pointer reading, all from one
    /// configuration snapshot.
    pub fn sample(&self, scan: &ScanPass, config: &AgcConfig) -> Result<TemperatureSample> {
        Ok(TemperatureSample {
            max_temp: scan.max_temp(),
            min_temp: scan.min_temp(),
            ptr_temp: self.pointer_temperature(&scan.linear16, config)?,
        })
    }
}
