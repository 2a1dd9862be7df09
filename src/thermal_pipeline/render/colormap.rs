use image::{GrayImage, Rgb, RgbImage};

/// JET colour for an 8-bit intensity: dark blue at 0 through cyan, green
/// and yellow to dark red at 255.
pub fn jet(value: u8) -> Rgb<u8> {
    let x = f32::from(value) / 255.0;
    let channel = |centre: f32| {
        let v = (1.5 - (4.0 * x - centre).abs()).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

pub fn apply_jet(gray: &GrayImage) -> RgbImage {
    let lut: Vec<Rgb<u8>> = (0..=u8::MAX).map(jet).collect();
    let (width, height) = gray.dimensions();
    let mut colored = RgbImage::new(width, height);
    for (dst, src) in colored.pixels_mut().zip(gray.pixels()) {
        *dst = lut[usize::from(src.0[0])];
    }
    colored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet(0), Rgb([0, 0, 128]));
        assert_eq!(jet(255), Rgb([128, 0, 0]));
    }

    #[test]
    fn test_jet_middle_is_green() {
        let Rgb([r, g, b]) = jet(128);
        assert_eq!(g, 255);
        assert!(r < 200 && b < 200);
    }

    #[test]
    fn test_apply_jet_maps_every_pixel() {
        let gray = GrayImage::from_raw(2, 1, vec![0, 255]).unwrap();
        let colored = apply_jet(&gray);
        assert_eq!(colored.get_pixel(0, 0), &jet(0));
        assert_eq!(colored.get_pixel(1, 0), &jet(255));
    }
}
