use float_cmp::ApproxEqRatio as _;

/// Compares two floating-point values for approximate equality using a ratio-based approach.
///
/// When comparing two values, the smaller value cannot deviate by more than 0.000001% of the larger value. Two NaN
/// values are considered equal.
pub(crate) fn float_eq(l_value: f64, r_value: f64) -> bool {
    const RATIO_ERROR: f64 = 0.00000001;

    (l_value.is_nan() && r_value.is_nan()) || l_value == r_value || l_value.approx_eq_ratio(&r_value, RATIO_ERROR)
}

#[cfg(test)]
mod tests {
    use super::float_eq;

    #[test]
    fn test_basic() {
        assert!(float_eq(1.0, 1.0));
        assert!(float_eq(0.0, 0.0));
        assert!(float_eq(f64::NAN, f64::NAN));
        assert!(float_eq(f64::INFINITY, f64::INFINITY));
        assert!(float_eq(1.0e9, 1.0e9 + 1.0e-3));

        assert!(!float_eq(1.0, 1.001));
        assert!(!float_eq(1.0, -1.0));
        assert!(!float_eq(1.0, f64::NAN));
    }
}
