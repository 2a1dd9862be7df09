//! Radiometric count <-> Celsius

/// Sensor counts per kelvin.
pub const COUNTS_PER_KELVIN: f64 = 100.0;
pub const KELVIN_OFFSET: f64 = 273.15;

#[inline]
pub fn count_to_celsius(count: u16) -> f64 {
    f64::from(count) / COUNTS_PER_KELVIN - KELVIN_OFFSET
}

/// Nearest count for a temperature, saturating at 0 below absolute zero.
///
/// Rounds rather than truncates: `(26.85 + 273.15) * 100.0` lands a hair
/// under 30000 in binary floating point and must still mean 30000. This
/// deliberately differs from a C-style truncating cast, which would give
/// 29314 instead of 29315 for 20 °C.
#[inline]
pub fn celsius_to_count(celsius: f64) -> u32 {
    let count = ((celsius + KELVIN_OFFSET) * COUNTS_PER_KELVIN).round();
    if count <= 0.0 {
        0
    } else {
        // `as` saturates at u32::MAX for out-of-range values.
        count as u32
    }
}
