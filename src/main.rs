use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use boson_thermal_rs::logger;
use boson_thermal_rs::thermal_pipeline::{
    CameraError, CameraSettings, FrameSink, SensorType, ThermalCamera, VideoBackend, VideoMode,
    Visualizer,
};

use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "boson_thermal")]
#[command(about = "Radiometric capture service for FLIR Boson thermal cameras", long_about = None)]
struct Cli {
    /// TOML settings file; flags below override it
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Video device node
    #[arg(long)]
    dev: Option<PathBuf>,

    /// Capture rate in Hz
    #[arg(long)]
    frame_rate: Option<f64>,

    /// RAW16 or YUV
    #[arg(long)]
    video_mode: Option<VideoMode>,

    /// Boson_320 or Boson_640
    #[arg(long)]
    sensor_type: Option<SensorType>,

    /// Publish only a 640x512 upscaled 16-bit frame (RAW16)
    #[arg(long)]
    zoom: bool,

    #[arg(long)]
    frame_id: Option<String>,

    #[arg(long)]
    camera_info_url: Option<String>,

    /// Give up on a dequeue after this many milliseconds
    #[arg(long)]
    capture_timeout_ms: Option<u64>,

    #[arg(long)]
    max_temp_limit: Option<f64>,

    #[arg(long)]
    min_temp_limit: Option<f64>,

    #[arg(long)]
    point_x: Option<i32>,

    #[arg(long)]
    point_y: Option<i32>,

    /// Stop after this many capture cycles
    #[arg(long)]
    frames: Option<u64>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn settings(&self) -> Result<CameraSettings> {
        let mut settings = match &self.config {
            Some(path) => CameraSettings::load_from(path)?,
            None => CameraSettings::default(),
        };

        if let Some(dev) = &self.dev {
            settings.dev = dev.clone();
        }
        if let Some(rate) = self.frame_rate {
            settings.frame_rate = rate;
        }
        if let Some(mode) = self.video_mode {
            settings.video_mode = mode;
        }
        if let Some(sensor) = self.sensor_type {
            settings.sensor_type = sensor;
        }
        if self.zoom {
            settings.zoom_enable = true;
        }
        if let Some(frame_id) = &self.frame_id {
            settings.frame_id = frame_id.clone();
        }
        if let Some(url) = &self.camera_info_url {
            settings.camera_info_url = url.clone();
        }
        if let Some(ms) = self.capture_timeout_ms {
            settings.capture_timeout_ms = Some(ms);
        }
        if let Some(limit) = self.max_temp_limit {
            settings.agc.max_temp_limit = limit;
        }
        if let Some(limit) = self.min_temp_limit {
            settings.agc.min_temp_limit = limit;
        }
        if let Some(x) = self.point_x {
            settings.agc.point_x = x;
        }
        if let Some(y) = self.point_y {
            settings.agc.point_y = y;
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Default)]
struct RunStats {
    cycles: u64,
    published: u64,
    failed: u64,
    overruns: u64,
}

/// Triggers one cycle per `period` until `shutdown` is raised, `max_cycles`
/// is reached or the device is lost. A late cycle is not made up for.
fn run_loop<B, V, S>(
    camera: &mut ThermalCamera<B, V, S>,
    period: Duration,
    max_cycles: Option<u64>,
    shutdown: &AtomicBool,
) -> RunStats
where
    B: VideoBackend,
    V: Visualizer,
    S: FrameSink,
{
    let mut stats = RunStats::default();
    let mut deadline = Instant::now();

    while !shutdown.load(Ordering::SeqCst) {
        if max_cycles.is_some_and(|limit| stats.cycles >= limit) {
            break;
        }

        stats.cycles += 1;
        match camera.run_cycle() {
            Ok(_) => stats.published += 1,
            Err(e) => {
                stats.failed += 1;
                if e.is_fatal() || matches!(e, CameraError::InvalidState { .. }) {
                    error!(error = %e, "Camera lost, stopping");
                    break;
                }
            }
        }

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            stats.overruns += 1;
            deadline = now;
        }
    }

    stats
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_with_default(&cli.log_level);

    info!("Starting boson_thermal...");

    let settings = cli.settings().context("Invalid camera settings")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(err) = ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl+C handler: {err}");
        }
    }

    let mut camera = ThermalCamera::new(&settings)
        .with_context(|| format!("Failed to bring up {}", settings.dev.display()))?;
    info!(
        "Streaming {} {} at {} Hz",
        camera.camera_info().camera_name,
        camera.geometry(),
        settings.frame_rate
    );

    let stats = run_loop(&mut camera, settings.frame_period(), cli.frames, &shutdown);
    info!(
        "Capture stopped: {} cycles, {} published, {} failed, {} overruns",
        stats.cycles, stats.published, stats.failed, stats.overruns
    );

    camera.shutdown().context("Failed to stop the camera cleanly")?;
    Ok(())
}
