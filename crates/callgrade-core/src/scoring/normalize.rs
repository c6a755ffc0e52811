/// Lowest normalized score
pub const MIN_SCORE: u8 = 1;
/// Highest normalized score
pub const MAX_SCORE: u8 = 10;

/// Round to the nearest integer, ties toward positive infinity.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Map a raw score in [-1.0, 1.0] onto the integer scale 1–10.
///
/// `clamp(round_half_up(((raw + 1) / 2) * 9 + 1), 1, 10)`. Inputs outside
/// [-1.0, 1.0] are clamped first; NaN is treated as 0.0.
pub fn normalize(raw_score: f64) -> u8 {
    let raw = if raw_score.is_nan() {
        0.0
    } else {
        raw_score.clamp(-1.0, 1.0)
    };
    let scaled = round_half_up(((raw + 1.0) / 2.0) * 9.0 + 1.0);
    scaled.clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(normalize(-1.0), 1);
        assert_eq!(normalize(1.0), 10);
        assert_eq!(normalize(0.0), 6);
    }

    #[test]
    fn test_reference_scores() {
        assert_eq!(normalize(0.8), 9);
        assert_eq!(normalize(0.7), 9);
        assert_eq!(normalize(0.5), 8);
        assert_eq!(normalize(0.6), 8);
        assert_eq!(normalize(-0.5), 3);
    }

    #[test]
    fn test_range_and_monotonic() {
        let mut previous = normalize(-1.0);
        for step in 0..=2000 {
            let raw = -1.0 + step as f64 / 1000.0;
            let score = normalize(raw);
            assert!((1..=10).contains(&score), "normalize({raw}) = {score}");
            assert!(score >= previous, "normalize decreased at {raw}");
            previous = score;
        }
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        assert_eq!(normalize(-3.0), 1);
        assert_eq!(normalize(42.0), 10);
        assert_eq!(normalize(f64::NEG_INFINITY), 1);
        assert_eq!(normalize(f64::NAN), 6);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(5.5), 6.0);
        assert_eq!(round_half_up(8.5), 9.0);
        assert_eq!(round_half_up(8.49), 8.0);
        assert_eq!(round_half_up(1.0), 1.0);
    }

    #[test]
    fn test_idempotent() {
        for raw in [-0.93, -0.1, 0.0, 0.33, 0.999] {
            assert_eq!(normalize(raw), normalize(raw));
        }
    }
}
