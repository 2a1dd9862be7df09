use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{error, info, info_span, instrument, warn};

use crate::thermal_pipeline::agc::{
    AgcTransform, CountWindow, ScanPass, ZOOM_GEOMETRY, luma_frame, normalize, zoom,
};
use crate::thermal_pipeline::camera::output::{
    CycleFrames, CycleOutput, RadiometricFrames, ScaledFrames,
};
use crate::thermal_pipeline::camera::reconfigure::{ConfigHandle, validate_config};
use crate::thermal_pipeline::camera::throttle::LogThrottle;
use crate::thermal_pipeline::capture::CaptureLoop;
use crate::thermal_pipeline::common::error::{CameraError, Result};
use crate::thermal_pipeline::common::timing::{CycleTimings, Timer};
use crate::thermal_pipeline::config::{AgcConfig, CameraSettings, ConfigStore, VideoMode};
use crate::thermal_pipeline::device::{FrameGeometry, V4l2Backend, VideoBackend};
use crate::thermal_pipeline::publish::{CameraInfo, FrameSink, TracingSink};
use crate::thermal_pipeline::render::{OverlayVisualizer, Visualizer};
use crate::thermal_pipeline::temperature::TemperatureSampler;

const RANGE_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// A streaming camera plus everything one trigger runs: capture, AGC,
/// temperature sampling, rendering and publishing.
pub struct ThermalCamera<B: VideoBackend, V: Visualizer, S: FrameSink> {
    capture: CaptureLoop<B>,
    agc: AgcTransform,
    sampler: TemperatureSampler,
    visualizer: V,
    sink: S,
    config: Arc<ConfigStore>,
    info: CameraInfo,
    mode: VideoMode,
    zoom_enable: bool,
    range_log: LogThrottle,
}

impl ThermalCamera<V4l2Backend, OverlayVisualizer, TracingSink> {
    /// Opens `settings.dev`, brings it to streaming and logs to tracing.
    pub fn new(settings: &CameraSettings) -> Result<Self> {
        log_settings(settings);
        let capture = CaptureLoop::open(settings)?;
        Ok(Self::with_custom(
            capture,
            OverlayVisualizer::new(),
            TracingSink::default(),
            settings,
        ))
    }
}

impl<B: VideoBackend, S: FrameSink> ThermalCamera<B, OverlayVisualizer, S> {
    /// Streaming `capture` with the default renderer and a custom sink.
    pub fn with_sink(capture: CaptureLoop<B>, sink: S, settings: &CameraSettings) -> Self {
        Self::with_custom(capture, OverlayVisualizer::new(), sink, settings)
    }
}

impl<B: VideoBackend, V: Visualizer, S: FrameSink> ThermalCamera<B, V, S> {
    pub fn with_custom(
        capture: CaptureLoop<B>,
        visualizer: V,
        sink: S,
        settings: &CameraSettings,
    ) -> Self {
        let geometry = capture.format().geometry;
        let info = CameraInfo::from_settings(settings, geometry);
        let initial = initial_config(settings.agc, geometry);

        Self {
            capture,
            agc: AgcTransform::new(),
            sampler: TemperatureSampler::new(),
            visualizer,
            sink,
            config: Arc::new(ConfigStore::new(initial)),
            info,
            mode: settings.video_mode,
            zoom_enable: settings.zoom_enable,
            range_log: LogThrottle::new(RANGE_LOG_INTERVAL),
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.capture.format().geometry
    }

    pub fn camera_info(&self) -> &CameraInfo {
        &self.info
    }

    pub fn capture(&self) -> &CaptureLoop<B> {
        &self.capture
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Snapshot of the live AGC configuration.
    pub fn config(&self) -> AgcConfig {
        self.config.read()
    }

    /// Handle for a reconfiguration context running elsewhere.
    pub fn config_handle(&self) -> ConfigHandle {
        ConfigHandle::new(Arc::clone(&self.config), self.geometry())
    }

    pub fn apply_config(&self, config: AgcConfig) -> Result<()> {
        self.config_handle().apply(config)
    }

    /// One capture cycle. Outputs go to the sink and are also returned.
    ///
    /// A capture failure is returned and nothing is published; an invalid
    /// temperature window only drops the 8-bit products of this cycle.
    #[instrument(skip(self), level = "debug")]
    pub fn run_cycle(&mut self) -> Result<CycleOutput> {
        let mut timings = CycleTimings::new();
        self.cycle(&mut timings)
    }

    pub fn run_cycle_with_timings(&mut self) -> Result<(CycleOutput, CycleTimings)> {
        let mut timings = CycleTimings::new();
        let output = self.cycle(&mut timings)?;
        timings.log_summary();
        Ok((output, timings))
    }

    /// Stops streaming and releases the device; later cycles fail.
    pub fn shutdown(&mut self) -> Result<()> {
        info!(camera = %self.info.camera_name, "Shutting down camera");
        self.capture.shutdown()
    }

    fn cycle(&mut self, timings: &mut CycleTimings) -> Result<CycleOutput> {
        // Read once; a reconfiguration landing mid-cycle applies next cycle.
        let config = self.config.read();

        let timer = Timer::start("capture");
        let frame = match self.capture.capture_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Frame capture failed, skipping cycle");
                return Err(e);
            }
        };
        let (name, duration) = timer.stop();
        timings.add_stage(name, duration);

        let stamp = SystemTime::now();
        let sequence = frame.sequence();

        let frames = match self.mode {
            VideoMode::Yuv => {
                let _span = info_span!("luma").entered();
                let gray8 = timings.measure("luma", || luma_frame(&frame))?;
                CycleFrames::Luma { gray8 }
            }
            VideoMode::Raw16 => {
                let scan = {
                    let _span = info_span!("scan").entered();
                    timings.measure("scan", || self.agc.scan(&frame))?
                };
                if self.zoom_enable {
                    let scale_error = CountWindow::from_limits(&config).err();
                    if let Some(e) = &scale_error {
                        self.log_range_error(e);
                    }
                    let _span = info_span!("zoom").entered();
                    let linear16 = timings.measure("zoom", || zoom(&scan.linear16, ZOOM_GEOMETRY));
                    CycleFrames::Zoomed {
                        linear16,
                        scale_error,
                    }
                } else {
                    CycleFrames::Radiometric(self.derive(scan, &config, timings)?)
                }
            }
        };

        let output = CycleOutput {
            stamp,
            sequence,
            frames,
        };

        {
            let _span = info_span!("publish").entered();
            let published = timings.measure("publish", || self.sink.publish(&output, &self.info));
            if let Err(e) = published {
                warn!(error = %e, sequence, "Sink rejected cycle output");
            }
        }

        Ok(output)
    }

    fn log_range_error(&mut self, e: &CameraError) {
        if let Some(suppressed) = self.range_log.ready() {
            error!(suppressed, "{e}");
        }
    }

    fn derive(
        &mut self,
        scan: ScanPass,
        config: &AgcConfig,
        timings: &mut CycleTimings,
    ) -> Result<RadiometricFrames> {
        let temperatures = timings.measure("sample", || self.sampler.sample(&scan, config))?;

        let scaled = {
            let _span = info_span!("scale").entered();
            timings.measure("scale", || self.agc.scale(&scan.linear16, config))
        };

        let (scaled, scale_error) = match scaled {
            Ok(linear8) => {
                let normalized8 = {
                    let _span = info_span!("normalize").entered();
                    timings.measure("normalize", || normalize(&linear8, config.norm_margin))
                };
                let _span = info_span!("render").entered();
                let heatmap8 = timings.measure("heatmap", || self.visualizer.heatmap(&linear8));
                let annotated8 = timings.measure("annotate", || {
                    self.visualizer
                        .annotate(&heatmap8, &temperatures, (config.point_x, config.point_y))
                });
                let frames = ScaledFrames {
                    linear8,
                    normalized8,
                    heatmap8,
                    annotated8,
                };
                (Some(frames), None)
            }
            Err(e) if e.is_range_error() => {
                self.log_range_error(&e);
                (None, Some(e))
            }
            Err(e) => return Err(e),
        };

        Ok(RadiometricFrames {
            linear16: scan.linear16,
            scaled,
            temperatures,
            scale_error,
        })
    }
}

/// Starting configuration; a pointer outside the negotiated frame is moved
/// to its centre rather than refusing to start.
fn initial_config(mut config: AgcConfig, geometry: FrameGeometry) -> AgcConfig {
    if let Err(e @ CameraError::PointerOutOfRange { .. }) = validate_config(&config, geometry) {
        let centre = ((geometry.width / 2) as i32, (geometry.height / 2) as i32);
        warn!(error = %e, x = centre.0, y = centre.1, "Pointer moved to frame centre");
        config.point_x = centre.0;
        config.point_y = centre.1;
    }
    if !config.norm_margin.is_finite() || !(0.0..=255.0).contains(&config.norm_margin) {
        let default = AgcConfig::default().norm_margin;
        warn!(norm_margin = config.norm_margin, default, "norm_margin out of range, using default");
        config.norm_margin = default;
    }
    config
}

fn log_settings(settings: &CameraSettings) {
    info!("frame_id: {}", settings.frame_id);
    info!("dev: {}", settings.dev.display());
    info!("frame_rate: {}", settings.frame_rate);
    info!("video_mode: {}", settings.video_mode);
    info!("zoom_enable: {}", settings.zoom_enable);
    info!("sensor_type: {}", settings.sensor_type);
    info!("camera_info_url: {}", settings.camera_info_url);
    match settings.capture_timeout() {
        Some(timeout) => info!("capture_timeout: {:?}", timeout),
        None => info!("capture_timeout: none"),
    }
}
