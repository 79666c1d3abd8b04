//! Decimal precision helpers for monetary and quantity values.
//!
//! Two precisions are used. Storage precision (4 digits) applies to every value that is
//! persisted or fed into further arithmetic, so repeated average updates don't accumulate
//! rounding error. Display precision (2 digits) applies only when values leave the crate.
//! Both round half away from zero.

/// Digits kept for persisted and computed values
pub const STORAGE_DIGITS: i32 = 4;

/// Digits kept for values shown to users
pub const DISPLAY_DIGITS: i32 = 2;

/// Largest difference still considered equal at storage precision
pub const STORAGE_EPSILON: f64 = 0.0001;

fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// Rounds `value` to storage precision (4 decimal digits).
#[must_use]
pub fn storage_precision(value: f64) -> f64 {
    round_to(value, STORAGE_DIGITS)
}

/// Rounds `value` to display precision (2 decimal digits).
#[must_use]
pub fn display_precision(value: f64) -> f64 {
    round_to(value, DISPLAY_DIGITS)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_storage_precision_rounds_to_four_digits() {
        assert_eq!(storage_precision(1.234_56), 1.2346);
        assert_eq!(storage_precision(1.234_54), 1.2345);
        assert_eq!(storage_precision(10.0), 10.0);
        assert_eq!(storage_precision(0.0), 0.0);
    }

    #[test]
    fn test_display_precision_rounds_to_two_digits() {
        assert_eq!(display_precision(5.004), 5.0);
        assert_eq!(display_precision(5.006), 5.01);
        assert_eq!(display_precision(3.3333), 3.33);
    }

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        assert_eq!(display_precision(0.125), 0.13);
        assert_eq!(display_precision(-0.125), -0.13);
        assert_eq!(storage_precision(0.000_05), 0.0001);
        assert_eq!(storage_precision(-0.000_05), -0.0001);
    }

    #[test]
    fn test_storage_precision_is_idempotent() {
        let samples = [
            0.0,
            1.0,
            2.999_95,
            3.141_592_653,
            1234.567_89,
            -42.424_242,
            0.1 + 0.2,
            1e-9,
            99_999.999_99,
        ];
        for x in samples {
            let once = storage_precision(x);
            assert_eq!(storage_precision(once), once, "not idempotent for {x}");
        }
    }

    #[test]
    fn test_display_precision_of_stored_value() {
        let stored = storage_precision(4.999_96);
        assert_eq!(stored, 5.0);
        assert_eq!(display_precision(stored), 5.0);
    }
}
