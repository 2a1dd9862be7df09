use std::io;
use std::time::Duration;

use tracing::{debug, instrument, trace};

use crate::thermal_pipeline::capture::frame::RawFrame;
use crate::thermal_pipeline::common::error::{CameraError, Result};
use crate::thermal_pipeline::config::{CameraSettings, SensorType, VideoMode};
use crate::thermal_pipeline::device::{
    ActiveFormat, BUFFER_INDEX, DeviceController, V4l2Backend, VideoBackend,
};

/// Pulls one frame per trigger through the single mapped buffer.
pub struct CaptureLoop<B: VideoBackend> {
    device: DeviceController<B>,
    format: ActiveFormat,
    timeout: Option<Duration>,
    // Buffer handed to the driver by a QBUF whose DQBUF never completed.
    queued: bool,
}

impl CaptureLoop<V4l2Backend> {
    /// Opens `settings.dev` and brings it to streaming.
    #[instrument(skip(settings), fields(dev = %settings.dev.display()))]
    pub fn open(settings: &CameraSettings) -> Result<Self> {
        let device = DeviceController::open(&settings.dev)?;
        Self::start(
            device,
            settings.video_mode,
            settings.sensor_type,
            settings.capture_timeout(),
        )
    }
}

impl<B: VideoBackend> CaptureLoop<B> {
    /// Brings an opened controller to streaming.
    pub fn start(
        mut device: DeviceController<B>,
        mode: VideoMode,
        sensor: SensorType,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let format = device.initialize(mode, sensor)?;
        Ok(Self {
            device,
            format,
            timeout,
            queued: false,
        })
    }

    pub fn format(&self) -> ActiveFormat {
        self.format
    }

    pub fn device(&self) -> &DeviceController<B> {
        &self.device
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// True while the driver still owns the buffer from an abandoned cycle.
    pub fn buffer_queued(&self) -> bool {
        self.queued
    }

    /// `QBUF` then `DQBUF`. A failure abandons this cycle only; the device
    /// stays streaming for the next one.
    ///
    /// When the previous cycle's `DQBUF` failed the buffer is still owned by
    /// the driver, so this cycle skips `QBUF` and only waits for it.
    pub fn capture_frame(&mut self) -> Result<RawFrame<'_>> {
        let format = self.format;
        let timeout = self.timeout;
        let backend = self.device.streaming_backend()?;

        if self.queued {
            debug!("Buffer still queued from an abandoned cycle, waiting on it");
        } else {
            backend
                .queue_buffer(BUFFER_INDEX)
                .map_err(|source| CameraError::CaptureCycle {
                    ioctl: "VIDIOC_QBUF",
                    source,
                })?;
            self.queued = true;
        }

        let dequeued = {
            let _span = tracing::info_span!("dequeue").entered();
            match backend.dequeue_buffer(timeout) {
                Ok(dequeued) => dequeued,
                Err(source) => {
                    // EINVAL means the driver holds no queued buffer.
                    if source.raw_os_error() == Some(libc::EINVAL) {
                        self.queued = false;
                    }
                    return Err(match timeout {
                        Some(limit) if source.kind() == io::ErrorKind::TimedOut => {
                            CameraError::CaptureTimeout(limit)
                        }
                        _ => CameraError::CaptureCycle {
                            ioctl: "VIDIOC_DQBUF",
                            source,
                        },
                    });
                }
            }
        };
        self.queued = false;
        trace!(
            sequence = dequeued.sequence,
            bytes_used = dequeued.bytes_used,
            "Buffer dequeued"
        );

        if dequeued.index != BUFFER_INDEX {
            return Err(CameraError::InvalidFrame(format!(
                "driver returned buffer {} but only buffer {BUFFER_INDEX} exists",
                dequeued.index
            )));
        }
        let needed = format.pixel_format.frame_len(format.geometry);
        if dequeued.bytes_used != 0 && dequeued.bytes_used < needed {
            debug!(bytes_used = dequeued.bytes_used, needed, "Short frame dropped");
            return Err(CameraError::InvalidFrame(format!(
                "driver filled {} of {needed} bytes",
                dequeued.bytes_used
            )));
        }

        let backend: &B = backend;
        RawFrame::new(backend.mapped(), format.geometry, format.pixel_format)
            .map(|frame| frame.with_sequence(dequeued.sequence))
    }

    /// Stops streaming and releases the device. Further captures fail with
    /// `InvalidState`.
    pub fn shutdown(&mut self) -> Result<()> {
        self.device.shutdown()
    }
}
