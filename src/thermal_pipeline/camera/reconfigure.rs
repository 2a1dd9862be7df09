use std::sync::Arc;

use tracing::{info, warn};

use crate::thermal_pipeline::common::error::{CameraError, Result};
use crate::thermal_pipeline::config::{AgcConfig, ConfigStore};
use crate::thermal_pipeline::device::FrameGeometry;

/// Checks a candidate configuration against the negotiated frame.
///
/// Temperature limits are deliberately not checked here: an inverted
/// window is accepted and then rejected by every cycle that uses it.
pub fn validate_config(config: &AgcConfig, geometry: FrameGeometry) -> Result<()> {
    if !geometry.contains(config.point_x, config.point_y) {
        return Err(CameraError::PointerOutOfRange {
            x: config.point_x,
            y: config.point_y,
            width: geometry.width,
            height: geometry.height,
        });
    }
    if !config.norm_margin.is_finite() || !(0.0..=255.0).contains(&config.norm_margin) {
        return Err(CameraError::InvalidSetting {
            name: "norm_margin",
            reason: format!("must lie in [0, 255], got {}", config.norm_margin),
        });
    }
    Ok(())
}

/// Reconfiguration entry point, cheap to clone into other threads.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    store: Arc<ConfigStore>,
    geometry: FrameGeometry,
}

impl ConfigHandle {
    pub fn new(store: Arc<ConfigStore>, geometry: FrameGeometry) -> Self {
        Self { store, geometry }
    }

    pub fn current(&self) -> AgcConfig {
        self.store.read()
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Replaces the whole configuration, or leaves the previous one in
    /// place when `config` is refused.
    pub fn apply(&self, config: AgcConfig) -> Result<()> {
        if let Err(e) = validate_config(&config, self.geometry) {
            warn!(error = %e, "Reconfiguration refused");
            return Err(e);
        }
        if config.max_temp_limit <= config.min_temp_limit {
            warn!(
                max_temp_limit = config.max_temp_limit,
                min_temp_limit = config.min_temp_limit,
                "Temperature window is empty, frames will not be scaled"
            );
        }
        self.store.update(config);
        info!(
            point_x = config.point_x,
            point_y = config.point_y,
            max_temp_limit = config.max_temp_limit,
            min_temp_limit = config.min_temp_limit,
            norm_margin = config.norm_margin,
            "Reconfigured"
        );
        Ok(())
    }
}
