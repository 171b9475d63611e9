use crate::{Digest, DigestError, DigestParams, DEFAULT_MAX_VALUE, DEFAULT_MIN_VALUE, DEFAULT_RELATIVE_ERROR};

const fn default_relative_error() -> f64 {
    DEFAULT_RELATIVE_ERROR
}

const fn default_min_value() -> f64 {
    DEFAULT_MIN_VALUE
}

const fn default_max_value() -> f64 {
    DEFAULT_MAX_VALUE
}

const fn default_bounded() -> bool {
    true
}

/// Digest configuration.
///
/// Describes a digest declaratively, so that it can be loaded from a configuration source when the `serde` feature is
/// enabled. Every field has a default, so an empty configuration describes a bounded digest with 1% relative error over
/// `[1e-6, 1e6]`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct DigestConfiguration {
    /// Maximum relative error of reported quantiles.
    ///
    /// Smaller values give more accurate quantiles at the cost of more buckets: halving the relative error roughly
    /// doubles the memory used by a digest.
    ///
    /// Defaults to 0.01 (1%).
    #[cfg_attr(feature = "serde", serde(default = "default_relative_error"))]
    pub relative_error: f64,

    /// Smallest value tracked by a bounded digest.
    ///
    /// Smaller values are clamped up to this value. Ignored when `bounded` is `false`.
    ///
    /// Defaults to 1e-6.
    #[cfg_attr(feature = "serde", serde(default = "default_min_value"))]
    pub min_value: f64,

    /// Largest value tracked by a bounded digest.
    ///
    /// Larger values are clamped down to this value. Ignored when `bounded` is `false`.
    ///
    /// Defaults to 1e6.
    #[cfg_attr(feature = "serde", serde(default = "default_max_value"))]
    pub max_value: f64,

    /// Whether the digest is bounded.
    ///
    /// Bounded digests allocate all of their buckets up front and never allocate when values are added. Unbounded
    /// digests accept any positive value the mapping can index, and grow their buckets as needed.
    ///
    /// Defaults to `true`.
    #[cfg_attr(feature = "serde", serde(default = "default_bounded"))]
    pub bounded: bool,
}

impl DigestConfiguration {
    /// Returns the validated digest parameters described by this configuration.
    ///
    /// # Errors
    ///
    /// If the relative error or, for bounded digests, the value range is invalid, an error is returned.
    pub fn params(&self) -> Result<DigestParams, DigestError> {
        if self.bounded {
            DigestParams::bounded(self.min_value, self.max_value, self.relative_error)
        } else {
            DigestParams::unbounded(self.relative_error)
        }
    }

    /// Builds an empty digest from this configuration.
    ///
    /// # Errors
    ///
    /// If the relative error or, for bounded digests, the value range is invalid, an error is returned.
    pub fn build(&self) -> Result<Digest, DigestError> {
        self.params().map(Digest::from_params)
    }
}

impl Default for DigestConfiguration {
    fn default() -> Self {
        Self {
            relative_error: default_relative_error(),
            min_value: default_min_value(),
            max_value: default_max_value(),
            bounded: default_bounded(),
        }
    }
}
