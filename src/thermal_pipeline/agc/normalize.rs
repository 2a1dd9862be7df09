use image::GrayImage;

/// Stretches `linear8` over its own observed range widened by `margin`.
///
/// The window is `[max(min - margin, 0), min(max + margin, 255)]`; a window
/// of zero width returns the frame unchanged.
pub fn normalize(linear8: &GrayImage, margin: f64) -> GrayImage {
    let Some((min, max)) = observed_range(linear8) else {
        return linear8.clone();
    };

    let low = (f64::from(min) - margin).max(0.0);
    let high = (f64::from(max) + margin).min(255.0);
    let span = high - low;
    if span == 0.0 {
        return linear8.clone();
    }

    let mut normalized = linear8.clone();
    for pixel in normalized.pixels_mut() {
        let value = (f64::from(pixel.0[0]) - low) * 255.0 / span;
        pixel.0[0] = value.round().clamp(0.0, 255.0) as u8;
    }
    normalized
}

fn observed_range(image: &GrayImage) -> Option<(u8, u8)> {
    image.pixels().map(|p| p.0[0]).fold(None, |range, v| match range {
        None => Some((v, v)),
        Some((min, max)) => Some((min.min(v), max.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(values: &[u8]) -> GrayImage {
        GrayImage::from_raw(values.len() as u32, 1, values.to_vec()).unwrap()
    }

    #[test]
    fn test_zero_margin_stretches_to_full_scale() {
        let out = normalize(&gray(&[100, 125, 150]), 0.0);
        assert_eq!(out.as_raw(), &vec![0, 128, 255]);
    }

    #[test]
    fn test_margin_is_kept_around_range() {
        // Window [90, 160]
        let out = normalize(&gray(&[100, 150]), 10.0);
        let expected_low = (10.0f64 * 255.0 / 70.0).round() as u8;
        let expected_high = (60.0f64 * 255.0 / 70.0).round() as u8;
        assert_eq!(out.as_raw(), &vec![expected_low, expected_high]);
    }

    #[test]
    fn test_window_is_clipped_to_byte_range() {
        let out = normalize(&gray(&[0, 255]), 10.0);
        assert_eq!(out.as_raw(), &vec![0, 255]);
    }

    #[test]
    fn test_flat_frame_without_margin_is_unchanged() {
        let input = gray(&[42, 42, 42]);
        assert_eq!(normalize(&input, 0.0), input);
    }

    #[test]
    fn test_flat_frame_with_margin() {
        // Window [32, 52], 42 sits in the middle.
        let out = normalize(&gray(&[42, 42]), 10.0);
        assert_eq!(out.as_raw(), &vec![128, 128]);
    }
}
