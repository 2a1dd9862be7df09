//! Visual products of a capture cycle
//!
//! Heatmap and annotated frames are presentation only; nothing downstream
//! reads temperatures back out of them.

mod colormap;
mod overlay;

use image::{GrayImage, Rgb, RgbImage};

use crate::thermal_pipeline::temperature::TemperatureSample;

pub use colormap::{apply_jet, jet};
pub use overlay::{GLYPH_HEIGHT, GLYPH_WIDTH, draw_ring, draw_text, fill_disc};

/// Rendering seam between the AGC output and the published colour frames.
pub trait Visualizer {
    /// Colour-maps the linear 8-bit frame.
    fn heatmap(&self, linear8: &GrayImage) -> RgbImage;

    /// Copy of `heatmap` with the three readings and the pointer drawn on it.
    fn annotate(&self, heatmap: &RgbImage, sample: &TemperatureSample, pointer: (i32, i32))
    -> RgbImage;
}

const TEXT_LEFT: i32 = 15;
const TEXT_ROWS: [i32; 3] = [15, 30, 45];
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const RING_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const DOT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// JET colour map with black text lines and a ringed pointer dot.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverlayVisualizer;

impl OverlayVisualizer {
    pub fn new() -> Self {
        Self
    }

    pub fn label_lines(sample: &TemperatureSample) -> [String; 3] {
        [
            format!("Max: {:.2} deg", sample.max_temp),
            format!("Min: {:.2} deg", sample.min_temp),
            format!("Ptr: {:.2} deg", sample.ptr_temp),
        ]
    }
}

impl Visualizer for OverlayVisualizer {
    fn heatmap(&self, linear8: &GrayImage) -> RgbImage {
        apply_jet(linear8)
    }

    fn annotate(
        &self,
        heatmap: &RgbImage,
        sample: &TemperatureSample,
        pointer: (i32, i32),
    ) -> RgbImage {
        let mut annotated = heatmap.clone();
        // Rows are text baselines.
        for (line, baseline) in Self::label_lines(sample).iter().zip(TEXT_ROWS) {
            draw_text(&mut annotated, TEXT_LEFT, baseline - GLYPH_HEIGHT, line, TEXT_COLOR);
        }
        let (x, y) = pointer;
        draw_ring(&mut annotated, x, y, 3, RING_COLOR);
        fill_disc(&mut annotated, x, y, 2, DOT_COLOR);
        annotated
    }
}
