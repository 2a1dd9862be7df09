#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use image::GrayImage;

    use crate::thermal_pipeline::camera::{CycleFrames, CycleOutput, ThermalCamera};
    use crate::thermal_pipeline::capture::CaptureLoop;
    use crate::thermal_pipeline::common::error::{CameraError, Result};
    use crate::thermal_pipeline::config::{AgcConfig, CameraSettings, SensorType, VideoMode};
    use crate::thermal_pipeline::device::{
        DeviceController, Ioctl, SimulatedBackend, SimulatedHandle,
    };
    use crate::thermal_pipeline::publish::{CameraInfo, FrameSink};
    use crate::thermal_pipeline::render::OverlayVisualizer;
    use crate::thermal_pipeline::temperature::{TemperatureSample, count_to_celsius};

    const WIDTH: usize = 320;
    const HEIGHT: usize = 256;

    #[derive(Debug, Clone)]
    struct Published {
        kind: &'static str,
        camera_name: String,
        temperatures: Option<TemperatureSample>,
        linear8: Option<GrayImage>,
    }

    struct RecordingSink {
        should_fail: bool,
        published: Arc<Mutex<Vec<Published>>>,
    }

    impl FrameSink for RecordingSink {
        fn publish(&mut self, output: &CycleOutput, info: &CameraInfo) -> Result<()> {
            if self.should_fail {
                return Err(CameraError::InvalidFrame("Mock sink error".to_string()));
            }
            self.published.lock().unwrap().push(Published {
                kind: output.kind(),
                camera_name: info.camera_name.clone(),
                temperatures: output.temperatures().copied(),
                linear8: output.scaled().map(|s| s.linear8.clone()),
            });
            Ok(())
        }
    }

    type TestCamera = ThermalCamera<SimulatedBackend, OverlayVisualizer, RecordingSink>;

    fn settings() -> CameraSettings {
        CameraSettings {
            sensor_type: SensorType::Boson320,
            agc: AgcConfig::builder()
                .temp_limits(-23.15, 26.85)
                .pointer(2, 1)
                .build(),
            ..CameraSettings::default()
        }
    }

    fn camera_with(
        settings: &CameraSettings,
        should_fail: bool,
    ) -> (TestCamera, SimulatedHandle, Arc<Mutex<Vec<Published>>>) {
        let backend = SimulatedBackend::new();
        let handle = backend.handle();
        let device = DeviceController::with_backend(backend, "/dev/video-sim");
        let capture = CaptureLoop::start(
            device,
            settings.video_mode,
            settings.sensor_type,
            settings.capture_timeout(),
        )
        .unwrap();
        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            should_fail,
            published: published.clone(),
        };
        (ThermalCamera::with_sink(capture, sink, settings), handle, published)
    }

    fn camera(
        settings: &CameraSettings,
    ) -> (TestCamera, SimulatedHandle, Arc<Mutex<Vec<Published>>>) {
        camera_with(settings, false)
    }

    /// 27500 everywhere, 25000 at (0, 0), 30000 at (1, 0), 28000 at (2, 1).
    fn scene() -> Vec<u16> {
        let mut counts = vec![27500; WIDTH * HEIGHT];
        counts[0] = 25000;
        counts[1] = 30000;
        counts[WIDTH + 2] = 28000;
        counts
    }

    #[test]
    fn test_end_to_end_scaling_and_temperatures() {
        let (mut camera, handle, published) = camera(&settings());
        handle.push_raw16(&scene());

        let output = camera.run_cycle().unwrap();

        let CycleFrames::Radiometric(frames) = &output.frames else {
            panic!("expected radiometric output, got {}", output.kind());
        };
        let scaled = frames.scaled.as_ref().unwrap();
        assert_eq!(scaled.linear8.get_pixel(0, 0).0[0], 0);
        assert_eq!(scaled.linear8.get_pixel(1, 0).0[0], 255);
        assert_eq!(scaled.linear8.get_pixel(5, 5).0[0], 127);
        assert_eq!(scaled.heatmap8.dimensions(), (WIDTH as u32, HEIGHT as u32));
        assert_eq!(scaled.annotated8.dimensions(), (WIDTH as u32, HEIGHT as u32));
        assert_eq!(frames.linear16.get_pixel(1, 0).0[0], 30000);

        let t = frames.temperatures;
        assert_eq!(t.max_temp, count_to_celsius(30000));
        assert_eq!(t.min_temp, count_to_celsius(25000));
        assert_eq!(t.ptr_temp, 28000.0 / 100.0 - 273.15);
        assert!(frames.scale_error.is_none());

        let published = published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].kind, "radiometric");
        assert_eq!(published[0].camera_name, "Boson320");
        assert_eq!(published[0].temperatures, Some(t));
    }

    #[test]
    fn test_normalized_frame_uses_margin() {
        let mut settings = settings();
        settings.agc.norm_margin = 0.0;
        let (mut camera, handle, _published) = camera(&settings);
        handle.push_raw16(&scene());

        let output = camera.run_cycle().unwrap();

        let normalized = &output.scaled().unwrap().normalized8;
        assert_eq!(normalized.get_pixel(0, 0).0[0], 0);
        assert_eq!(normalized.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn test_inverted_limits_skip_only_scaling() {
        let (mut camera, handle, published) = camera(&settings());
        let mut config = camera.config();
        config.max_temp_limit = 20.0;
        config.min_temp_limit = 40.0;
        camera.apply_config(config).unwrap();
        handle.push_raw16(&scene());
        handle.push_raw16(&scene());

        let output = camera.run_cycle().unwrap();

        let CycleFrames::Radiometric(frames) = &output.frames else {
            panic!("expected radiometric output");
        };
        assert!(frames.scaled.is_none());
        assert!(matches!(
            frames.scale_error,
            Some(CameraError::ConfigRange { .. })
        ));
        assert_eq!(frames.temperatures.max_temp, count_to_celsius(30000));
        assert_eq!(published.lock().unwrap()[0].linear8, None);

        config.min_temp_limit = -23.15;
        config.max_temp_limit = 26.85;
        camera.apply_config(config).unwrap();
        let output = camera.run_cycle().unwrap();
        assert!(output.scaled().is_some());
    }

    #[test]
    fn test_equal_limits_are_rejected_per_cycle() {
        let mut settings = settings();
        settings.agc.max_temp_limit = 30.0;
        settings.agc.min_temp_limit = 30.0;
        let (mut camera, handle, _published) = camera(&settings);
        handle.push_raw16(&scene());

        let output = camera.run_cycle().unwrap();

        assert!(output.scaled().is_none());
        assert!(output.temperatures().is_some());
    }

    #[test]
    fn test_capture_failure_publishes_nothing() {
        let (mut camera, handle, published) = camera(&settings());
        handle.push_raw16(&scene());
        handle.fail_next(Ioctl::DequeueBuffer);

        let failed = camera.run_cycle();
        assert!(matches!(failed, Err(CameraError::CaptureCycle { .. })));
        assert!(published.lock().unwrap().is_empty());

        assert!(camera.run_cycle().is_ok());
        assert_eq!(published.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_sink_failure_does_not_fail_cycle() {
        let (mut camera, handle, published) = camera_with(&settings(), true);
        handle.push_raw16(&scene());

        assert!(camera.run_cycle().is_ok());
        assert!(published.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zoom_publishes_only_resized_16bit() {
        let mut settings = settings();
        settings.zoom_enable = true;
        let (mut camera, handle, published) = camera(&settings);
        handle.push_raw16(&vec![29000; WIDTH * HEIGHT]);

        let output = camera.run_cycle().unwrap();

        let CycleFrames::Zoomed { linear16, .. } = &output.frames else {
            panic!("expected zoomed output, got {}", output.kind());
        };
        assert_eq!(linear16.dimensions(), (640, 512));
        assert!(output.temperatures().is_none());
        assert!(output.scale_error().is_none());
        assert_eq!(published.lock().unwrap()[0].kind, "zoomed");
    }

    #[test]
    fn test_zoom_still_checks_configured_window() {
        let mut settings = settings();
        settings.zoom_enable = true;
        settings.agc.max_temp_limit = 20.0;
        settings.agc.min_temp_limit = 40.0;
        let (mut camera, handle, _published) = camera(&settings);
        handle.push_raw16(&vec![29000; WIDTH * HEIGHT]);

        let output = camera.run_cycle().unwrap();

        assert_eq!(output.kind(), "zoomed");
        assert!(matches!(
            output.scale_error(),
            Some(CameraError::ConfigRange { .. })
        ));
    }

    #[test]
    fn test_yuv_mode_publishes_luma() {
        let mut settings = settings();
        settings.video_mode = VideoMode::Yuv;
        let (mut camera, handle, _published) = camera(&settings);
        assert_eq!(camera.geometry().width, 640);

        let mut frame = vec![77u8; 640 * 512];
        frame.extend(vec![128u8; 640 * 512 / 2]);
        handle.push_frame(frame);

        let output = camera.run_cycle().unwrap();

        let CycleFrames::Luma { gray8 } = &output.frames else {
            panic!("expected luma output, got {}", output.kind());
        };
        assert_eq!(gray8.dimensions(), (640, 512));
        assert!(gray8.pixels().all(|p| p.0[0] == 77));
    }

    #[test]
    fn test_out_of_range_pointer_update_keeps_previous_config() {
        let (camera, _handle, _published) = camera(&settings());
        let before = camera.config();

        let result = camera.apply_config(AgcConfig {
            point_x: WIDTH as i32,
            ..before
        });

        assert!(matches!(result, Err(CameraError::PointerOutOfRange { .. })));
        assert_eq!(camera.config(), before);
    }

    #[test]
    fn test_initial_pointer_outside_frame_moves_to_centre() {
        let mut settings = settings();
        settings.agc = AgcConfig::default();
        let (camera, _handle, _published) = camera(&settings);

        let config = camera.config();

        assert_eq!((config.point_x, config.point_y), (160, 128));
    }

    #[test]
    fn test_pointer_update_applies_next_cycle() {
        let (mut camera, handle, _published) = camera(&settings());
        handle.push_raw16(&scene());
        handle.push_raw16(&scene());

        let first = camera.run_cycle().unwrap();
        camera
            .config_handle()
            .apply(AgcConfig {
                point_x: 1,
                point_y: 0,
                ..camera.config()
            })
            .unwrap();
        let second = camera.run_cycle().unwrap();

        assert_eq!(first.temperatures().unwrap().ptr_temp, count_to_celsius(28000));
        assert_eq!(second.temperatures().unwrap().ptr_temp, count_to_celsius(30000));
    }

    #[test]
    fn test_timings_cover_each_stage() {
        let (mut camera, handle, _published) = camera(&settings());
        handle.push_raw16(&scene());

        let (_output, timings) = camera.run_cycle_with_timings().unwrap();

        for stage in [
            "capture",
            "scan",
            "sample",
            "scale",
            "normalize",
            "heatmap",
            "annotate",
            "publish",
        ] {
            assert!(timings.get_stage(stage).is_some(), "missing stage {stage}");
        }
    }

    #[test]
    fn test_no_cycles_after_shutdown() {
        let (mut camera, handle, _published) = camera(&settings());
        camera.shutdown().unwrap();
        handle.push_raw16(&scene());

        assert!(matches!(
            camera.run_cycle(),
            Err(CameraError::InvalidState { .. })
        ));
        assert_eq!(handle.count(Ioctl::StreamOff), 1);
        assert!(!handle.is_mapped());
    }

    #[test]
    fn test_concurrent_reconfiguration_is_never_torn() {
        const A: (i32, i32) = (10, 10);
        const B: (i32, i32) = (100, 200);
        let at = |(x, y): (i32, i32)| y as usize * WIDTH + x as usize;

        let mut counts = vec![27500; WIDTH * HEIGHT];
        counts[at(A)] = 29000;
        counts[at(B)] = 30000;
        counts[at((A.0, B.1))] = 26000;
        counts[at((B.0, A.1))] = 26000;

        let (mut camera, handle, _published) = camera(&settings());
        let base = camera.config();
        let reconfigure = camera.config_handle();

        let writer = thread::spawn(move || {
            for i in 0..500 {
                let (x, y) = if i % 2 == 0 { A } else { B };
                reconfigure
                    .apply(AgcConfig {
                        point_x: x,
                        point_y: y,
                        ..base
                    })
                    .unwrap();
            }
        });

        for _ in 0..50 {
            handle.push_raw16(&counts);
            let output = camera.run_cycle().unwrap();
            let ptr = output.temperatures().unwrap().ptr_temp;
            assert_ne!(ptr, count_to_celsius(26000));
        }

        writer.join().unwrap();
    }
}
