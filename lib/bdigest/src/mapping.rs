//! Logarithmic index mapping.

/// Maps positive values to bucket keys on a log-gamma scale, and bucket keys back to representative values.
///
/// Keys are computed as `key(x) = ceil(ln(x) / ln(gamma))`, so the bucket with key `k` covers `(gamma^(k-1),
/// gamma^k]`. The representative value of a bucket, `2 * gamma^k / (gamma + 1)`, is within a relative error of `alpha`
/// of every value in the bucket, given `gamma = 1 + 2 * alpha / (1 - alpha)`.
///
/// Keys are `i32`, so only values within [`min_indexable_value`][Self::min_indexable_value] and
/// [`max_indexable_value`][Self::max_indexable_value] can be mapped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogGammaMapping {
    relative_error: f64,
    gamma: f64,
    gamma_ln: f64,
    min_indexable_value: f64,
    max_indexable_value: f64,
}

impl LogGammaMapping {
    /// Creates a mapping for the given relative error.
    ///
    /// The relative error is expected to already be validated to lie within (0, 1).
    pub(crate) fn new(relative_error: f64) -> Self {
        let growth = 2.0 * relative_error / (1.0 - relative_error);
        let gamma = 1.0 + growth;
        let gamma_ln = growth.ln_1p();

        // The smallest value is constrained by the smallest positive normal `f64`, and the largest by representative
        // values staying finite. Both are constrained by `i32` key overflow.
        let min_indexable_value = f64::MIN_POSITIVE.max(((f64::from(i32::MIN) + 1.0) * gamma_ln).exp());
        let max_indexable_value = ((f64::from(i32::MAX) - 1.0) * gamma_ln).exp().min(f64::MAX / gamma);

        Self {
            relative_error,
            gamma,
            gamma_ln,
            min_indexable_value,
            max_indexable_value,
        }
    }

    /// Returns the relative error guaranteed by this mapping.
    pub fn relative_error(&self) -> f64 {
        self.relative_error
    }

    /// Returns the bucket growth factor.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Returns the natural logarithm of the bucket growth factor.
    pub fn gamma_ln(&self) -> f64 {
        self.gamma_ln
    }

    /// Returns the smallest value that can be mapped to a key.
    pub fn min_indexable_value(&self) -> f64 {
        self.min_indexable_value
    }

    /// Returns the largest value that can be mapped to a key.
    pub fn max_indexable_value(&self) -> f64 {
        self.max_indexable_value
    }

    /// Returns `true` if the given value can be mapped to a key.
    ///
    /// NaN is never indexable.
    pub fn is_indexable(&self, value: f64) -> bool {
        value >= self.min_indexable_value && value <= self.max_indexable_value
    }

    /// Returns the key of the bucket holding the given value.
    ///
    /// The value must be [indexable][Self::is_indexable], otherwise the key saturates.
    #[allow(clippy::cast_possible_truncation)]
    #[inline]
    pub fn key(&self, value: f64) -> i32 {
        (value.ln() / self.gamma_ln).ceil() as i32
    }

    /// Returns the representative value of the bucket with the given key.
    #[inline]
    pub fn value(&self, key: i32) -> f64 {
        // Divided before doubling, so the largest representative values stay finite.
        self.pow_gamma(key) / (self.gamma + 1.0) * 2.0
    }

    /// Returns the exclusive lower bound of the bucket with the given key.
    pub fn lower_bound(&self, key: i32) -> f64 {
        self.pow_gamma(key.saturating_sub(1))
    }

    /// Returns the inclusive upper bound of the bucket with the given key.
    pub fn upper_bound(&self, key: i32) -> f64 {
        self.pow_gamma(key)
    }

    #[inline]
    fn pow_gamma(&self, key: i32) -> f64 {
        (f64::from(key) * self.gamma_ln).exp()
    }
}
