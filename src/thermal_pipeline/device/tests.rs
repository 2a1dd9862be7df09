#[cfg(test)]
mod tests {
    use crate::thermal_pipeline::common::error::CameraError;
    use crate::thermal_pipeline::config::{SensorType, VideoMode};
    use crate::thermal_pipeline::device::{
        DeviceController, DeviceState, FrameGeometry, Ioctl, PixelFormat, SimulatedBackend,
        SimulatedHandle,
    };

    fn controller(
        backend: SimulatedBackend,
    ) -> (DeviceController<SimulatedBackend>, SimulatedHandle) {
        let handle = backend.handle();
        (DeviceController::with_backend(backend, "/dev/video-sim"), handle)
    }

    #[test]
    fn test_bring_up_follows_ioctl_order() {
        let (mut device, handle) = controller(SimulatedBackend::new());

        let format = device
            .initialize(VideoMode::Raw16, SensorType::Boson640)
            .unwrap();

        assert_eq!(device.state(), DeviceState::Streaming);
        assert_eq!(format.pixel_format, PixelFormat::Y16);
        assert_eq!(format.geometry, FrameGeometry::new(640, 512));
        assert_eq!(
            handle.calls(),
            vec![
                Ioctl::QueryCap,
                Ioctl::SetFormat,
                Ioctl::RequestBuffers,
                Ioctl::QueryBuffer,
                Ioctl::Mmap,
                Ioctl::StreamOn,
            ]
        );
        assert!(handle.is_streaming());
    }

    #[test]
    fn test_raw16_geometry_follows_sensor() {
        let (mut device, _handle) = controller(SimulatedBackend::new());
        let format = device
            .initialize(VideoMode::Raw16, SensorType::Boson320)
            .unwrap();
        assert_eq!(format.geometry, FrameGeometry::new(320, 256));
        assert_eq!(device.buffer_info().unwrap().length, 320 * 256 * 2);
    }

    #[test]
    fn test_yuv_is_fixed_640x512() {
        let (mut device, _handle) = controller(SimulatedBackend::new());
        let format = device
            .initialize(VideoMode::Yuv, SensorType::Boson320)
            .unwrap();
        assert_eq!(format.pixel_format, PixelFormat::Yvu420);
        assert_eq!(format.geometry, FrameGeometry::new(640, 512));
    }

    #[test]
    fn test_streamon_failure_never_reaches_streaming() {
        let backend = SimulatedBackend::new();
        backend.handle().fail_always(Ioctl::StreamOn);
        let (mut device, handle) = controller(backend);

        let result = device.initialize(VideoMode::Raw16, SensorType::Boson640);

        assert!(matches!(
            result,
            Err(CameraError::StreamControl { ioctl: "VIDIOC_STREAMON", .. })
        ));
        assert_eq!(device.state(), DeviceState::Closed);
        assert!(!device.is_open());
        assert!(!handle.is_streaming());
        assert!(!handle.is_mapped());
        assert_eq!(handle.calls().last(), Some(&Ioctl::Munmap));
    }

    #[test]
    fn test_missing_capture_capability() {
        let (mut device, handle) = controller(SimulatedBackend::new().without_video_capture());

        let result = device.initialize(VideoMode::Raw16, SensorType::Boson640);

        assert!(matches!(result, Err(CameraError::Capability(_))));
        assert_eq!(handle.calls(), vec![Ioctl::QueryCap]);
        assert!(!device.is_open());
    }

    #[test]
    fn test_missing_streaming_io() {
        let (mut device, handle) = controller(SimulatedBackend::new().without_streaming());

        let result = device.initialize(VideoMode::Raw16, SensorType::Boson640);

        assert!(matches!(result, Err(CameraError::Capability(_))));
        assert_eq!(handle.count(Ioctl::SetFormat), 0);
    }

    #[test]
    fn test_rejected_format() {
        let backend = SimulatedBackend::new();
        backend.handle().fail_always(Ioctl::SetFormat);
        let (mut device, handle) = controller(backend);

        let result = device.initialize(VideoMode::Raw16, SensorType::Boson640);

        assert!(matches!(result, Err(CameraError::FormatNegotiation(_))));
        assert_eq!(handle.count(Ioctl::RequestBuffers), 0);
        assert_eq!(device.state(), DeviceState::Closed);
    }

    #[test]
    fn test_substituted_format_counts_as_rejection() {
        let backend =
            SimulatedBackend::new().answering_format(*b"YUYV", FrameGeometry::new(640, 512));
        let (mut device, handle) = controller(backend);

        let result = device.initialize(VideoMode::Raw16, SensorType::Boson640);

        assert!(matches!(result, Err(CameraError::FormatNegotiation(_))));
        assert_eq!(handle.count(Ioctl::RequestBuffers), 0);
    }

    #[test]
    fn test_resized_format_counts_as_rejection() {
        let backend =
            SimulatedBackend::new().answering_format(*b"Y16 ", FrameGeometry::new(320, 256));
        let (mut device, _handle) = controller(backend);

        let result = device.initialize(VideoMode::Raw16, SensorType::Boson640);

        assert!(matches!(result, Err(CameraError::FormatNegotiation(_))));
    }

    #[test]
    fn test_buffer_request_failures() {
        let backend = SimulatedBackend::new();
        backend.handle().fail_always(Ioctl::RequestBuffers);
        let (mut device, _handle) = controller(backend);
        assert!(matches!(
            device.initialize(VideoMode::Raw16, SensorType::Boson640),
            Err(CameraError::BufferAllocation(_))
        ));

        let (mut device, handle) = controller(SimulatedBackend::new().granting_buffers(0));
        assert!(matches!(
            device.initialize(VideoMode::Raw16, SensorType::Boson640),
            Err(CameraError::BufferAllocation(_))
        ));
        assert_eq!(handle.count(Ioctl::QueryBuffer), 0);

        let backend = SimulatedBackend::new();
        backend.handle().fail_always(Ioctl::QueryBuffer);
        let (mut device, handle) = controller(backend);
        assert!(matches!(
            device.initialize(VideoMode::Raw16, SensorType::Boson640),
            Err(CameraError::BufferAllocation(_))
        ));
        assert_eq!(handle.count(Ioctl::Mmap), 0);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let (mut device, handle) = controller(SimulatedBackend::new().with_buffer_length(1024));

        let result = device.initialize(VideoMode::Raw16, SensorType::Boson640);

        assert!(matches!(result, Err(CameraError::BufferAllocation(_))));
        assert_eq!(handle.count(Ioctl::Mmap), 0);
    }

    #[test]
    fn test_mmap_failure() {
        let backend = SimulatedBackend::new();
        backend.handle().fail_always(Ioctl::Mmap);
        let (mut device, handle) = controller(backend);

        let result = device.initialize(VideoMode::Raw16, SensorType::Boson640);

        assert!(matches!(result, Err(CameraError::MemoryMap(_))));
        assert_eq!(handle.count(Ioctl::StreamOn), 0);
        assert_eq!(handle.count(Ioctl::Munmap), 0);
        assert!(!device.is_open());
    }

    #[test]
    fn test_failed_controller_stays_closed() {
        let backend = SimulatedBackend::new();
        backend.handle().fail_next(Ioctl::StreamOn);
        let (mut device, handle) = controller(backend);
        assert!(device.initialize(VideoMode::Raw16, SensorType::Boson640).is_err());

        let retry = device.initialize(VideoMode::Raw16, SensorType::Boson640);

        assert!(matches!(
            retry,
            Err(CameraError::InvalidState { actual: "released", .. })
        ));
        assert_eq!(handle.count(Ioctl::QueryCap), 1);
    }

    #[test]
    fn test_out_of_order_step_is_refused_without_teardown() {
        let (mut device, handle) = controller(SimulatedBackend::new());

        let result = device.start_streaming();

        assert!(matches!(
            result,
            Err(CameraError::InvalidState { expected: "configured", actual: "closed" })
        ));
        assert!(device.is_open());
        assert!(handle.calls().is_empty());
    }

    #[test]
    fn test_shutdown_releases_in_order() {
        let (mut device, handle) = controller(SimulatedBackend::new());
        device.initialize(VideoMode::Raw16, SensorType::Boson640).unwrap();

        device.shutdown().unwrap();

        let calls = handle.calls();
        assert_eq!(&calls[calls.len() - 2..], &[Ioctl::StreamOff, Ioctl::Munmap]);
        assert_eq!(device.state(), DeviceState::Closed);
        assert!(!device.is_open());

        device.shutdown().unwrap();
        assert_eq!(handle.count(Ioctl::StreamOff), 1);
    }

    #[test]
    fn test_streamoff_failure_still_releases() {
        let (mut device, handle) = controller(SimulatedBackend::new());
        device.initialize(VideoMode::Raw16, SensorType::Boson640).unwrap();
        handle.fail_next(Ioctl::StreamOff);

        let result = device.shutdown();

        assert!(matches!(
            result,
            Err(CameraError::StreamControl { ioctl: "VIDIOC_STREAMOFF", .. })
        ));
        assert!(!handle.is_mapped());
        assert!(!device.is_open());
    }

    #[test]
    fn test_drop_shuts_down() {
        let (mut device, handle) = controller(SimulatedBackend::new());
        device.initialize(VideoMode::Raw16, SensorType::Boson640).unwrap();

        drop(device);

        assert_eq!(handle.count(Ioctl::StreamOff), 1);
        assert!(!handle.is_mapped());
    }
}
