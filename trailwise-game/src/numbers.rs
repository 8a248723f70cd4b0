//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Truncate a non-negative f64 toward zero as u32, returning 0 for NaN or negative values.
#[must_use]
pub fn trunc_f64_to_u32(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let max = f64::from(u32::MAX);
    cast::<f64, u32>(value.min(max).trunc()).unwrap_or(0)
}

/// Truncate a f64 toward zero and clamp it to the i32 range.
#[must_use]
pub fn trunc_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = f64::from(i32::MIN);
    let max = f64::from(i32::MAX);
    cast::<f64, i32>(value.clamp(min, max).trunc()).unwrap_or(0)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a wide total to f64, accepting precision loss past 2^53.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Ratio of two counts, returning 0.0 when the denominator is zero.
#[must_use]
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    usize_to_f64(numerator) / usize_to_f64(denominator)
}

/// Round to the given number of decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounders_cover_ranges() {
        assert_eq!(round_f64_to_i32(1.6), 2);
        assert_eq!(round_f64_to_i32(f64::NAN), 0);
        assert_eq!(round_f64_to_i32(f64::from(i32::MAX) * 2.0), i32::MAX);
    }

    #[test]
    fn truncation_floors_toward_zero() {
        assert_eq!(trunc_f64_to_u32(1.99), 1);
        assert_eq!(trunc_f64_to_u32(-3.0), 0);
        assert_eq!(trunc_f64_to_u32(f64::NAN), 0);
        assert_eq!(trunc_f64_to_i32(-2.7), -2);
        assert_eq!(trunc_f64_to_i32(f64::INFINITY), i32::MAX);
    }

    #[test]
    fn ratio_handles_zero_denominator() {
        assert!(ratio(3, 0).abs() < f64::EPSILON);
        assert!((ratio(1, 4) - 0.25).abs() < f64::EPSILON);
        assert!((round_to(2.345_6, 2) - 2.35).abs() < 1e-9);
        assert!((u64_to_f64(1 << 20) - 1_048_576.0).abs() < f64::EPSILON);
        assert!((usize_to_f64(7) - 7.0).abs() < f64::EPSILON);
    }
}
