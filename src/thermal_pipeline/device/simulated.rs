//! In-process stand-in for a capture device.
//!
//! Answers the same ioctl surface as the kernel backend, records every call
//! in order and can be told to fail any of them. Frames are fed through a
//! [`SimulatedHandle`] that stays usable after the backend has been moved
//! into a controller.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::thermal_pipeline::device::backend::VideoBackend;
use crate::thermal_pipeline::device::types::{
    BufferInfo, DequeuedBuffer, DeviceCapabilities, FormatRequest, FrameGeometry,
    NegotiatedFormat,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ioctl {
    QueryCap,
    SetFormat,
    RequestBuffers,
    QueryBuffer,
    Mmap,
    Munmap,
    StreamOn,
    StreamOff,
    QueueBuffer,
    DequeueBuffer,
}

impl Ioctl {
    pub fn name(self) -> &'static str {
        match self {
            Ioctl::QueryCap => "VIDIOC_QUERYCAP",
            Ioctl::SetFormat => "VIDIOC_S_FMT",
            Ioctl::RequestBuffers => "VIDIOC_REQBUFS",
            Ioctl::QueryBuffer => "VIDIOC_QUERYBUF",
            Ioctl::Mmap => "mmap",
            Ioctl::Munmap => "munmap",
            Ioctl::StreamOn => "VIDIOC_STREAMON",
            Ioctl::StreamOff => "VIDIOC_STREAMOFF",
            Ioctl::QueueBuffer => "VIDIOC_QBUF",
            Ioctl::DequeueBuffer => "VIDIOC_DQBUF",
        }
    }
}

impl fmt::Display for Ioctl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Packs radiometric counts the way the sensor does: low byte first.
pub fn encode_raw16(counts: &[u16]) -> Vec<u8> {
    counts.iter().flat_map(|c| c.to_le_bytes()).collect()
}

#[derive(Debug, Default)]
struct Shared {
    calls: Vec<Ioctl>,
    frames: VecDeque<Vec<u8>>,
    fail_always: Vec<Ioctl>,
    fail_once: Vec<Ioctl>,
    mapped: bool,
    streaming: bool,
}

impl Shared {
    fn record(&mut self, call: Ioctl) -> io::Result<()> {
        self.calls.push(call);
        if self.fail_always.contains(&call) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        if let Some(pos) = self.fail_once.iter().position(|c| *c == call) {
            self.fail_once.remove(pos);
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        Ok(())
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Test-side view of a [`SimulatedBackend`].
#[derive(Debug, Clone)]
pub struct SimulatedHandle {
    shared: Arc<Mutex<Shared>>,
}

impl SimulatedHandle {
    /// Queues a frame for a later `DQBUF`.
    pub fn push_frame(&self, bytes: Vec<u8>) {
        lock(&self.shared).frames.push_back(bytes);
    }

    pub fn push_raw16(&self, counts: &[u16]) {
        self.push_frame(encode_raw16(counts));
    }

    /// Makes every future `call` fail with `EIO`.
    pub fn fail_always(&self, call: Ioctl) {
        lock(&self.shared).fail_always.push(call);
    }

    /// Makes only the next `call` fail with `EIO`.
    pub fn fail_next(&self, call: Ioctl) {
        lock(&self.shared).fail_once.push(call);
    }

    pub fn calls(&self) -> Vec<Ioctl> {
        lock(&self.shared).calls.clone()
    }

    pub fn count(&self, call: Ioctl) -> usize {
        lock(&self.shared).calls.iter().filter(|c| **c == call).count()
    }

    pub fn is_mapped(&self) -> bool {
        lock(&self.shared).mapped
    }

    pub fn is_streaming(&self) -> bool {
        lock(&self.shared).streaming
    }

    pub fn pending_frames(&self) -> usize {
        lock(&self.shared).frames.len()
    }
}

/// A [`VideoBackend`] with no kernel behind it.
#[derive(Debug)]
pub struct SimulatedBackend {
    shared: Arc<Mutex<Shared>>,
    capabilities: DeviceCapabilities,
    answer: Option<NegotiatedFormat>,
    granted_buffers: u32,
    buffer_length: Option<usize>,
    requested: Option<FormatRequest>,
    mapping: Vec<u8>,
    queued: bool,
    sequence: u32,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            shared: Arc::default(),
            capabilities: DeviceCapabilities {
                driver: "uvcvideo".to_string(),
                card: "Boson: FLIR Video".to_string(),
                video_capture: true,
                streaming: true,
            },
            answer: None,
            granted_buffers: 1,
            buffer_length: None,
            requested: None,
            mapping: Vec::new(),
            queued: false,
            sequence: 0,
        }
    }

    pub fn handle(&self) -> SimulatedHandle {
        SimulatedHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Reports a device without single-planar capture support.
    pub fn without_video_capture(mut self) -> Self {
        self.capabilities.video_capture = false;
        self
    }

    pub fn without_streaming(mut self) -> Self {
        self.capabilities.streaming = false;
        self
    }

    /// Answers `S_FMT` with this format instead of echoing the request.
    pub fn answering_format(mut self, fourcc: [u8; 4], geometry: FrameGeometry) -> Self {
        self.answer = Some(NegotiatedFormat {
            fourcc,
            geometry,
            size_image: geometry.pixel_count() * 2,
        });
        self
    }

    pub fn granting_buffers(mut self, count: u32) -> Self {
        self.granted_buffers = count;
        self
    }

    pub fn with_buffer_length(mut self, length: usize) -> Self {
        self.buffer_length = Some(length);
        self
    }

    fn record(&self, call: Ioctl) -> io::Result<()> {
        lock(&self.shared).record(call)
    }
}

impl VideoBackend for SimulatedBackend {
    fn query_capabilities(&mut self) -> io::Result<DeviceCapabilities> {
        self.record(Ioctl::QueryCap)?;
        Ok(self.capabilities.clone())
    }

    fn set_format(&mut self, request: &FormatRequest) -> io::Result<NegotiatedFormat> {
        self.record(Ioctl::SetFormat)?;
        self.requested = Some(*request);
        Ok(self.answer.clone().unwrap_or(NegotiatedFormat {
            fourcc: request.pixel_format.fourcc(),
            geometry: request.geometry,
            size_image: request.pixel_format.frame_len(request.geometry),
        }))
    }

    fn request_buffers(&mut self, _count: u32) -> io::Result<u32> {
        self.record(Ioctl::RequestBuffers)?;
        Ok(self.granted_buffers)
    }

    fn query_buffer(&mut self, index: u32) -> io::Result<BufferInfo> {
        self.record(Ioctl::QueryBuffer)?;
        let length = self.buffer_length.unwrap_or_else(|| {
            self.requested
                .map(|r| r.pixel_format.frame_len(r.geometry))
                .unwrap_or(0)
        });
        Ok(BufferInfo {
            index,
            length,
            offset: 0,
        })
    }

    fn map_buffer(&mut self, info: &BufferInfo) -> io::Result<()> {
        self.record(Ioctl::Mmap)?;
        self.mapping = vec![0; info.length];
        lock(&self.shared).mapped = true;
        Ok(())
    }

    fn unmap_buffer(&mut self) -> io::Result<()> {
        let mut shared = lock(&self.shared);
        if !shared.mapped {
            return Ok(());
        }
        shared.record(Ioctl::Munmap)?;
        shared.mapped = false;
        self.mapping.clear();
        Ok(())
    }

    fn stream_on(&mut self) -> io::Result<()> {
        let mut shared = lock(&self.shared);
        shared.record(Ioctl::StreamOn)?;
        shared.streaming = true;
        Ok(())
    }

    fn stream_off(&mut self) -> io::Result<()> {
        let mut shared = lock(&self.shared);
        // The stream is gone even when the driver complains.
        shared.streaming = false;
        self.queued = false;
        shared.record(Ioctl::StreamOff)
    }

    fn queue_buffer(&mut self, _index: u32) -> io::Result<()> {
        self.record(Ioctl::QueueBuffer)?;
        if self.queued {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        self.queued = true;
        Ok(())
    }

    fn dequeue_buffer(&mut self, timeout: Option<Duration>) -> io::Result<DequeuedBuffer> {
        let mut shared = lock(&self.shared);
        shared.record(Ioctl::DequeueBuffer)?;
        if !self.queued {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        let Some(frame) = shared.frames.pop_front() else {
            let message = match timeout {
                Some(t) => format!("no frame within {t:?}"),
                None => "no frame queued on the simulated device".to_string(),
            };
            return Err(io::Error::new(io::ErrorKind::TimedOut, message));
        };
        drop(shared);

        let used = frame.len().min(self.mapping.len());
        self.mapping[..used].copy_from_slice(&frame[..used]);
        self.queued = false;
        self.sequence += 1;
        Ok(DequeuedBuffer {
            index: 0,
            bytes_used: used,
            sequence: self.sequence,
        })
    }

    fn mapped(&self) -> &[u8] {
        &self.mapping
    }
}
