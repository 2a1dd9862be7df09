use std::path::Path;

use tracing::{debug, error, info, instrument, warn};

use crate::thermal_pipeline::common::error::{CameraError, Result};
use crate::thermal_pipeline::config::{SensorType, VideoMode, stream_geometry};
use crate::thermal_pipeline::device::backend::VideoBackend;
use crate::thermal_pipeline::device::types::{
    BufferInfo, DeviceCapabilities, DeviceState, FormatRequest, FrameGeometry, PixelFormat,
};
use crate::thermal_pipeline::device::v4l2_backend::V4l2Backend;

/// The one buffer index ever requested from the driver.
pub const BUFFER_INDEX: u32 = 0;

/// Format in force once `VIDIOC_S_FMT` succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveFormat {
    pub mode: VideoMode,
    pub pixel_format: PixelFormat,
    pub geometry: FrameGeometry,
}

/// Drives a capture device through `Closed -> Configured -> Streaming -> Closed`.
///
/// Any failure on the way up tears the device down (unmap, close) and leaves
/// the controller permanently closed; a new controller is needed to retry.
pub struct DeviceController<B: VideoBackend> {
    backend: Option<B>,
    path: String,
    state: DeviceState,
    capabilities: Option<DeviceCapabilities>,
    format: Option<ActiveFormat>,
    buffer: Option<BufferInfo>,
}

impl DeviceController<V4l2Backend> {
    /// Opens the device node read/write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let backend = V4l2Backend::open(path).map_err(|source| {
            error!(path = %path.display(), "Invalid video device");
            CameraError::DeviceOpen {
                path: path.display().to_string(),
                source,
            }
        })?;
        Ok(Self::with_backend(backend, path.display().to_string()))
    }
}

impl<B: VideoBackend> DeviceController<B> {
    /// Wraps an already opened backend.
    pub fn with_backend(backend: B, path: impl Into<String>) -> Self {
        Self {
            backend: Some(backend),
            path: path.into(),
            state: DeviceState::Closed,
            capabilities: None,
            format: None,
            buffer: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// False once the descriptor has been released.
    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    pub fn capabilities(&self) -> Option<&DeviceCapabilities> {
        self.capabilities.as_ref()
    }

    pub fn format(&self) -> Option<ActiveFormat> {
        self.format
    }

    pub fn buffer_info(&self) -> Option<BufferInfo> {
        self.buffer
    }

    /// Runs the whole bring-up sequence and leaves the device streaming.
    #[instrument(skip(self), fields(path = %self.path))]
    pub fn initialize(&mut self, mode: VideoMode, sensor: SensorType) -> Result<ActiveFormat> {
        self.query_capabilities()?;
        let format = self.negotiate_format(mode, sensor)?;
        self.allocate_buffer()?;
        self.start_streaming()?;
        info!(
            format = %format.pixel_format,
            geometry = %format.geometry,
            "Device streaming"
        );
        Ok(format)
    }

    pub fn query_capabilities(&mut self) -> Result<DeviceCapabilities> {
        self.expect_state(DeviceState::Closed)?;
        let queried = self.backend_mut()?.query_capabilities();
        let caps = match queried {
            Ok(caps) => caps,
            Err(e) => {
                return Err(self.abort(CameraError::Capability(format!(
                    "VIDIOC_QUERYCAP: {e}"
                ))));
            }
        };
        if !caps.video_capture {
            return Err(self.abort(CameraError::Capability(format!(
                "{} ({}) does not handle single-planar video capture",
                caps.card, caps.driver
            ))));
        }
        if !caps.streaming {
            return Err(self.abort(CameraError::Capability(format!(
                "{} ({}) does not support streaming I/O",
                caps.card, caps.driver
            ))));
        }
        debug!(driver = %caps.driver, card = %caps.card, "Capabilities queried");
        self.capabilities = Some(caps.clone());
        Ok(caps)
    }

    /// Requests Y16 at sensor resolution (RAW16) or YV12 at 640x512 (YUV).
    pub fn negotiate_format(
        &mut self,
        mode: VideoMode,
        sensor: SensorType,
    ) -> Result<ActiveFormat> {
        self.expect_state(DeviceState::Closed)?;
        if self.capabilities.is_none() {
            return Err(CameraError::InvalidState {
                expected: "queried for capabilities",
                actual: self.state.as_str(),
            });
        }

        let request = FormatRequest {
            pixel_format: mode.pixel_format(),
            geometry: stream_geometry(mode, sensor),
        };
        let negotiated = match self.backend_mut()?.set_format(&request) {
            Ok(negotiated) => negotiated,
            Err(e) => {
                return Err(self.abort(CameraError::FormatNegotiation(format!(
                    "VIDIOC_S_FMT {} {}: {e}",
                    request.pixel_format, request.geometry
                ))));
            }
        };

        if PixelFormat::from_fourcc(negotiated.fourcc) != Some(request.pixel_format)
            || negotiated.geometry != request.geometry
        {
            return Err(self.abort(CameraError::FormatNegotiation(format!(
                "requested {} {}, device answered {} {}",
                request.pixel_format,
                request.geometry,
                String::from_utf8_lossy(&negotiated.fourcc),
                negotiated.geometry
            ))));
        }

        debug!(
            format = %request.pixel_format,
            geometry = %request.geometry,
            size_image = negotiated.size_image,
            "Format negotiated"
        );
        let format = ActiveFormat {
            mode,
            pixel_format: request.pixel_format,
            geometry: request.geometry,
        };
        self.format = Some(format);
        Ok(format)
    }

    /// `REQBUFS(count=1)`, `QUERYBUF(index=0)` and `mmap`. Moves to `Configured`.
    pub fn allocate_buffer(&mut self) -> Result<BufferInfo> {
        self.expect_state(DeviceState::Closed)?;
        let Some(format) = self.format else {
            return Err(CameraError::InvalidState {
                expected: "format negotiated",
                actual: self.state.as_str(),
            });
        };

        let granted = match self.backend_mut()?.request_buffers(1) {
            Ok(granted) => granted,
            Err(e) => {
                return Err(self.abort(CameraError::BufferAllocation(format!(
                    "VIDIOC_REQBUFS: {e}"
                ))));
            }
        };
        if granted < 1 {
            return Err(self.abort(CameraError::BufferAllocation(
                "VIDIOC_REQBUFS granted no buffers".to_string(),
            )));
        }

        let info = match self.backend_mut()?.query_buffer(BUFFER_INDEX) {
            Ok(info) => info,
            Err(e) => {
                return Err(self.abort(CameraError::BufferAllocation(format!(
                    "VIDIOC_QUERYBUF: {e}"
                ))));
            }
        };
        let needed = format.pixel_format.frame_len(format.geometry);
        if info.length < needed {
            return Err(self.abort(CameraError::BufferAllocation(format!(
                "buffer of {} bytes cannot hold a {} {} frame ({needed} bytes)",
                info.length, format.geometry, format.pixel_format
            ))));
        }

        if let Err(e) = self.backend_mut()?.map_buffer(&info) {
            return Err(self.abort(CameraError::MemoryMap(format!(
                "{} bytes at offset {}: {e}",
                info.length, info.offset
            ))));
        }

        debug!(length = info.length, offset = info.offset, "Capture buffer mapped");
        self.buffer = Some(info);
        self.state = DeviceState::Configured;
        Ok(info)
    }

    pub fn start_streaming(&mut self) -> Result<()> {
        self.expect_state(DeviceState::Configured)?;
        if let Err(source) = self.backend_mut()?.stream_on() {
            error!(error = %source, "Failed to activate streaming on the camera");
            return Err(self.abort(CameraError::StreamControl {
                ioctl: "VIDIOC_STREAMON",
                source,
            }));
        }
        self.state = DeviceState::Streaming;
        Ok(())
    }

    /// Stops streaming but keeps the buffer mapped (`Streaming -> Configured`).
    pub fn stop_streaming(&mut self) -> Result<()> {
        self.expect_state(DeviceState::Streaming)?;
        // The device is no longer trusted to be streaming either way.
        self.state = DeviceState::Configured;
        self.backend_mut()?
            .stream_off()
            .map_err(|source| CameraError::StreamControl {
                ioctl: "VIDIOC_STREAMOFF",
                source,
            })
    }

    /// Stops streaming if needed, unmaps the buffer and closes the descriptor.
    /// A failing `STREAMOFF` is returned, but only after everything was released.
    #[instrument(skip(self), fields(path = %self.path, state = %self.state))]
    pub fn shutdown(&mut self) -> Result<()> {
        let stop_result = if self.state == DeviceState::Streaming {
            self.stop_streaming()
        } else {
            Ok(())
        };
        if let Err(e) = &stop_result {
            error!(error = %e, "Failed to disable streaming on the camera");
        }
        self.release();
        info!("Device closed");
        stop_result
    }

    /// Streaming backend for the capture loop.
    pub(crate) fn streaming_backend(&mut self) -> Result<&mut B> {
        self.expect_state(DeviceState::Streaming)?;
        self.backend_mut()
    }

    fn backend_mut(&mut self) -> Result<&mut B> {
        self.backend.as_mut().ok_or(CameraError::InvalidState {
            expected: "open",
            actual: "released",
        })
    }

    fn expect_state(&self, expected: DeviceState) -> Result<()> {
        if self.backend.is_none() {
            return Err(CameraError::InvalidState {
                expected: expected.as_str(),
                actual: "released",
            });
        }
        if self.state != expected {
            return Err(CameraError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            });
        }
        Ok(())
    }

    /// Bring-up failure: release everything and hand the error back.
    fn abort(&mut self, err: CameraError) -> CameraError {
        error!(path = %self.path, error = %err, "Device bring-up aborted");
        self.release();
        err
    }

    fn release(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.unmap_buffer() {
                warn!(error = %e, "Failed to unmap capture buffer");
            }
            // Dropping the backend closes the descriptor.
            drop(backend);
        }
        self.buffer = None;
        self.state = DeviceState::Closed;
    }
}

impl<B: VideoBackend> Drop for DeviceController<B> {
    fn drop(&mut self) {
        if self.backend.is_some() {
            let _ = self.shutdown();
        }
    }
}
