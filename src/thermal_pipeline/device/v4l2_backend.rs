//! Kernel video-capture backend.
//!
//! Talks to a `/dev/videoN` node through the `v4l` crate: the device handle
//! and the format/capability helpers come from its high-level API, the
//! single-buffer streaming steps go through its raw `v4l2` ioctl wrappers so
//! that every protocol step stays individually observable.

use std::io;
use std::os::raw::{c_int, c_void};
use std::path::Path;
use std::time::Duration;
use std::{mem, ptr, slice};

use tracing::{debug, warn};
use v4l::buffer::Type as BufferType;
use v4l::capability::Flags as CapabilityFlags;
use v4l::memory::Memory;
use v4l::v4l_sys::{v4l2_buffer, v4l2_requestbuffers};
use v4l::video::Capture;
use v4l::{Device, Format, FourCC, v4l2};

use crate::thermal_pipeline::device::backend::VideoBackend;
use crate::thermal_pipeline::device::types::{
    BufferInfo, DequeuedBuffer, DeviceCapabilities, FormatRequest, FrameGeometry,
    NegotiatedFormat,
};

/// Process mapping of the kernel capture buffer.
struct MappedBuffer {
    ptr: *mut c_void,
    len: usize,
}

// SAFETY: the mapping is plain shared memory owned by this process; moving the
// owner to another thread does not change who may touch it.
unsafe impl Send for MappedBuffer {}

impl MappedBuffer {
    fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` came from a successful mmap of `len` bytes and stays
        // mapped until `self` is dropped.
        unsafe { slice::from_raw_parts(self.ptr as *const u8, self.len) }
    }
}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr/len describe a live mapping created in `map_buffer`.
        if let Err(e) = unsafe { v4l2::munmap(self.ptr, self.len) } {
            warn!(error = %e, "munmap of capture buffer failed");
        }
    }
}

/// A V4L2 capture node. Fields drop in order, so the mapping is released
/// before the descriptor is closed.
pub struct V4l2Backend {
    mapping: Option<MappedBuffer>,
    device: Device,
}

impl V4l2Backend {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let device = Device::with_path(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Opened video device");
        Ok(Self {
            mapping: None,
            device,
        })
    }

    fn fd(&self) -> c_int {
        self.device.handle().fd()
    }

    fn capture_buffer(index: u32) -> v4l2_buffer {
        v4l2_buffer {
            index,
            type_: BufferType::VideoCapture as u32,
            memory: Memory::Mmap as u32,
            // SAFETY: v4l2_buffer is a C struct for which all-zero is valid.
            ..unsafe { mem::zeroed() }
        }
    }

    fn wait_readable(&self, timeout: Option<Duration>) -> io::Result<()> {
        let timeout_ms = match timeout {
            Some(t) => c_int::try_from(t.as_millis()).unwrap_or(c_int::MAX),
            None => -1,
        };
        let mut pollfd = libc::pollfd {
            fd: self.fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        loop {
            // SAFETY: pollfd points to one initialised entry.
            let ready = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };
            match ready {
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "no frame before the capture timeout",
                    ));
                }
                n if n > 0 => return Ok(()),
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() != io::ErrorKind::Interrupted {
                        return Err(err);
                    }
                }
            }
        }
    }
}

impl VideoBackend for V4l2Backend {
    fn query_capabilities(&mut self) -> io::Result<DeviceCapabilities> {
        let caps = self.device.query_caps()?;
        Ok(DeviceCapabilities {
            driver: caps.driver,
            card: caps.card,
            video_capture: caps.capabilities.contains(CapabilityFlags::VIDEO_CAPTURE),
            streaming: caps.capabilities.contains(CapabilityFlags::STREAMING),
        })
    }

    fn set_format(&mut self, request: &FormatRequest) -> io::Result<NegotiatedFormat> {
        let fourcc = request.pixel_format.fourcc();
        let format = Format::new(
            request.geometry.width as u32,
            request.geometry.height as u32,
            FourCC::new(&fourcc),
        );
        let applied = self.device.set_format(&format)?;
        Ok(NegotiatedFormat {
            fourcc: applied.fourcc.repr,
            geometry: FrameGeometry::new(applied.width as usize, applied.height as usize),
            size_image: applied.size as usize,
        })
    }

    fn request_buffers(&mut self, count: u32) -> io::Result<u32> {
        let mut request = v4l2_requestbuffers {
            count,
            type_: BufferType::VideoCapture as u32,
            memory: Memory::Mmap as u32,
            // SAFETY: all-zero is a valid v4l2_requestbuffers.
            ..unsafe { mem::zeroed() }
        };
        // SAFETY: the argument is a properly initialised v4l2_requestbuffers.
        unsafe {
            v4l2::ioctl(
                self.fd(),
                v4l2::vidioc::VIDIOC_REQBUFS,
                &mut request as *mut _ as *mut c_void,
            )?;
        }
        Ok(request.count)
    }

    fn query_buffer(&mut self, index: u32) -> io::Result<BufferInfo> {
        let mut buffer = Self::capture_buffer(index);
        // SAFETY: the argument is a properly initialised v4l2_buffer.
        unsafe {
            v4l2::ioctl(
                self.fd(),
                v4l2::vidioc::VIDIOC_QUERYBUF,
                &mut buffer as *mut _ as *mut c_void,
            )?;
        }
        Ok(BufferInfo {
            index: buffer.index,
            length: buffer.length as usize,
            // SAFETY: for MMAP buffers the kernel fills the `offset` member.
            offset: unsafe { buffer.m.offset },
        })
    }

    fn map_buffer(&mut self, info: &BufferInfo) -> io::Result<()> {
        // SAFETY: offset/length were reported by VIDIOC_QUERYBUF for this fd.
        let ptr = unsafe {
            v4l2::mmap(
                ptr::null_mut(),
                info.length,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                self.fd(),
                info.offset as _,
            )?
        };
        // SAFETY: the mapping is writable and exactly `length` bytes long.
        unsafe { ptr::write_bytes(ptr as *mut u8, 0, info.length) };
        self.mapping = Some(MappedBuffer {
            ptr,
            len: info.length,
        });
        Ok(())
    }

    fn unmap_buffer(&mut self) -> io::Result<()> {
        if let Some(mapping) = self.mapping.take() {
            let (ptr, len) = (mapping.ptr, mapping.len);
            mem::forget(mapping);
            // SAFETY: ptr/len describe the live mapping just taken out of self.
            unsafe { v4l2::munmap(ptr, len)? };
        }
        Ok(())
    }

    fn stream_on(&mut self) -> io::Result<()> {
        let mut buffer_type = BufferType::VideoCapture as u32;
        // SAFETY: STREAMON takes a pointer to the buffer type.
        unsafe {
            v4l2::ioctl(
                self.fd(),
                v4l2::vidioc::VIDIOC_STREAMON,
                &mut buffer_type as *mut _ as *mut c_void,
            )
        }
    }

    fn stream_off(&mut self) -> io::Result<()> {
        let mut buffer_type = BufferType::VideoCapture as u32;
        // SAFETY: STREAMOFF takes a pointer to the buffer type.
        unsafe {
            v4l2::ioctl(
                self.fd(),
                v4l2::vidioc::VIDIOC_STREAMOFF,
                &mut buffer_type as *mut _ as *mut c_void,
            )
        }
    }

    fn queue_buffer(&mut self, index: u32) -> io::Result<()> {
        let mut buffer = Self::capture_buffer(index);
        // SAFETY: the argument is a properly initialised v4l2_buffer.
        unsafe {
            v4l2::ioctl(
                self.fd(),
                v4l2::vidioc::VIDIOC_QBUF,
                &mut buffer as *mut _ as *mut c_void,
            )
        }
    }

    fn dequeue_buffer(&mut self, timeout: Option<Duration>) -> io::Result<DequeuedBuffer> {
        // The v4l crate opens nodes non-blocking, so readiness is awaited here.
        self.wait_readable(timeout)?;
        let mut buffer = Self::capture_buffer(0);
        // SAFETY: the argument is a properly initialised v4l2_buffer.
        unsafe {
            v4l2::ioctl(
                self.fd(),
                v4l2::vidioc::VIDIOC_DQBUF,
                &mut buffer as *mut _ as *mut c_void,
            )?;
        }
        Ok(DequeuedBuffer {
            index: buffer.index,
            bytes_used: buffer.bytesused as usize,
            sequence: buffer.sequence,
        })
    }

    fn mapped(&self) -> &[u8] {
        self.mapping.as_ref().map_or(&[], MappedBuffer::as_slice)
    }
}
