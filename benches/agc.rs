use boson_thermal_rs::thermal_pipeline::agc::{AgcTransform, normalize, zoom, ZOOM_GEOMETRY};
use boson_thermal_rs::thermal_pipeline::device::encode_raw16;
use boson_thermal_rs::thermal_pipeline::{
    AgcConfig, CameraSettings, CaptureLoop, DeviceController, FrameGeometry, OverlayVisualizer,
    PixelFormat, RawFrame, SensorType, SimulatedBackend, ThermalCamera, TracingSink, Visualizer,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn generate_scene(width: usize, height: usize) -> Vec<u8> {
    let mut counts = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            counts.push(27315 + ((x * 7 + y * 3) % 4000) as u16);
        }
    }
    encode_raw16(&counts)
}

fn sensors() -> [(SensorType, &'static str); 2] {
    [(SensorType::Boson320, "320x256"), (SensorType::Boson640, "640x512")]
}

fn benchmark_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("agc_scan");
    let agc = AgcTransform::new();

    for (sensor, label) in sensors() {
        let geometry = sensor.raw16_geometry();
        let bytes = generate_scene(geometry.width, geometry.height);
        group.bench_with_input(BenchmarkId::from_parameter(label), &bytes, |b, bytes| {
            b.iter(|| {
                let frame = RawFrame::new(black_box(bytes), geometry, PixelFormat::Y16).unwrap();
                agc.scan(&frame).unwrap()
            });
        });
    }

    group.finish();
}

fn benchmark_scale(c: &mut Criterion) {
    let mut group = c.benchmark_group("agc_scale");
    let agc = AgcTransform::new();
    let config = AgcConfig::default();

    for (sensor, label) in sensors() {
        let geometry = sensor.raw16_geometry();
        let bytes = generate_scene(geometry.width, geometry.height);
        let frame = RawFrame::new(&bytes, geometry, PixelFormat::Y16).unwrap();
        let scan = agc.scan(&frame).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(label), &scan, |b, scan| {
            b.iter(|| agc.scale(black_box(&scan.linear16), &config).unwrap());
        });
    }

    group.finish();
}

fn benchmark_derived_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("derived_frames");
    let agc = AgcTransform::new();
    let visualizer = OverlayVisualizer::new();
    let geometry = FrameGeometry::new(640, 512);
    let bytes = generate_scene(geometry.width, geometry.height);
    let frame = RawFrame::new(&bytes, geometry, PixelFormat::Y16).unwrap();
    let scan = agc.scan(&frame).unwrap();
    let linear8 = agc.scale(&scan.linear16, &AgcConfig::default()).unwrap();

    group.bench_function("normalize", |b| b.iter(|| normalize(black_box(&linear8), 10.0)));
    group.bench_function("heatmap", |b| b.iter(|| visualizer.heatmap(black_box(&linear8))));

    let small = sensors()[0].0.raw16_geometry();
    let small_bytes = generate_scene(small.width, small.height);
    let small_frame = RawFrame::new(&small_bytes, small, PixelFormat::Y16).unwrap();
    let small_scan = agc.scan(&small_frame).unwrap();
    group.bench_function("zoom_320_to_640", |b| {
        b.iter(|| zoom(black_box(&small_scan.linear16), ZOOM_GEOMETRY))
    });

    group.finish();
}

fn benchmark_full_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_cycle");

    for (sensor, label) in sensors() {
        let settings = CameraSettings {
            sensor_type: sensor,
            ..CameraSettings::default()
        };
        let geometry = sensor.raw16_geometry();
        let bytes = generate_scene(geometry.width, geometry.height);

        let backend = SimulatedBackend::new();
        let handle = backend.handle();
        let device = DeviceController::with_backend(backend, "/dev/video-sim");
        let capture =
            CaptureLoop::start(device, settings.video_mode, sensor, None).unwrap();
        let mut camera = ThermalCamera::with_sink(capture, TracingSink::default(), &settings);

        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            b.iter(|| {
                handle.push_frame(bytes.clone());
                camera.run_cycle().unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_scan,
    benchmark_scale,
    benchmark_derived_frames,
    benchmark_full_cycle
);
criterion_main!(benches);
