use std::io;
use std::time::Duration;

use crate::thermal_pipeline::device::types::{
    BufferInfo, DequeuedBuffer, DeviceCapabilities, FormatRequest, NegotiatedFormat,
};

/// The video-capture ioctl surface used by [`super::DeviceController`].
///
/// Each method maps onto one step of the kernel protocol
/// (`QUERYCAP`, `S_FMT`, `REQBUFS`, `QUERYBUF`, `mmap`, `STREAMON`,
/// `QBUF`, `DQBUF`, `STREAMOFF`). Sequencing is the controller's job;
/// implementations only report what the device said.
pub trait VideoBackend {
    fn query_capabilities(&mut self) -> io::Result<DeviceCapabilities>;

    fn set_format(&mut self, request: &FormatRequest) -> io::Result<NegotiatedFormat>;

    /// Returns the number of buffers the driver actually granted.
    fn request_buffers(&mut self, count: u32) -> io::Result<u32>;

    fn query_buffer(&mut self, index: u32) -> io::Result<BufferInfo>;

    fn map_buffer(&mut self, info: &BufferInfo) -> io::Result<()>;

    /// Releases the mapping. Calling it with nothing mapped is a no-op.
    fn unmap_buffer(&mut self) -> io::Result<()>;

    fn stream_on(&mut self) -> io::Result<()>;

    fn stream_off(&mut self) -> io::Result<()>;

    fn queue_buffer(&mut self, index: u32) -> io::Result<()>;

    /// Blocks until the device hands a buffer back. With a timeout, an
    /// expired wait is reported as [`io::ErrorKind::TimedOut`].
    fn dequeue_buffer(&mut self, timeout: Option<Duration>) -> io::Result<DequeuedBuffer>;

    /// Contents of the mapped buffer; empty when nothing is mapped.
    fn mapped(&self) -> &[u8];
}
