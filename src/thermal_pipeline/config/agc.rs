//! Runtime-adjustable AGC configuration

use serde::Deserialize;

/// Temperature window, pointer position and normalisation margin used by
/// every capture cycle. Changed at runtime through [`super::ConfigStore`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgcConfig {
    /// Upper end of the linear AGC window in degrees Celsius
    pub max_temp_limit: f64,
    /// Lower end of the linear AGC window in degrees Celsius
    pub min_temp_limit: f64,
    /// Margin (0-255 units) kept around the observed range when auto-normalising
    pub norm_margin: f64,
    /// Pointer column sampled for the pointer temperature
    pub point_x: i32,
    /// Pointer row sampled for the pointer temperature
    pub point_y: i32,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            max_temp_limit: 40.0,
            min_temp_limit: 20.0,
            norm_margin: 10.0,
            point_x: 320,
            point_y: 256,
        }
    }
}

impl AgcConfig {
    pub fn builder() -> AgcConfigBuilder {
        AgcConfigBuilder::default()
    }
}

/// Builder for AgcConfig
#[derive(Default)]
pub struct AgcConfigBuilder {
    max_temp_limit: Option<f64>,
    min_temp_limit: Option<f64>,
    norm_margin: Option<f64>,
    point_x: Option<i32>,
    point_y: Option<i32>,
}

impl AgcConfigBuilder {
    pub fn max_temp_limit(mut self, celsius: f64) -> Self {
        self.max_temp_limit = Some(celsius);
        self
    }

    pub fn min_temp_limit(mut self, celsius: f64) -> Self {
        self.min_temp_limit = Some(celsius);
        self
    }

    pub fn temp_limits(self, min_celsius: f64, max_celsius: f64) -> Self {
        self.min_temp_limit(min_celsius).max_temp_limit(max_celsius)
    }

    pub fn norm_margin(mut self, margin: f64) -> Self {
        self.norm_margin = Some(margin);
        self
    }

    pub fn pointer(mut self, x: i32, y: i32) -> Self {
        self.point_x = Some(x);
        self.point_y = Some(y);
        self
    }

    pub fn build(self) -> AgcConfig {
        let default = AgcConfig::default();
        AgcConfig {
            max_temp_limit: self.max_temp_limit.unwrap_or(default.max_temp_limit),
            min_temp_limit: self.min_temp_limit.unwrap_or(default.min_temp_limit),
            norm_margin: self.norm_margin.unwrap_or(default.norm_margin),
            point_x: self.point_x.unwrap_or(default.point_x),
            point_y: self.point_y.unwrap_or(default.point_y),
        }
    }
}
