use std::fmt;

use ordered_float::NotNan;
use snafu::ensure;

use crate::error::{InvalidMaxValue, InvalidMinValue, InvalidRelative};
use crate::{BucketShape, DigestError, LogGammaMapping};

/// Default relative error, used by [`Default`] digests and configurations.
pub const DEFAULT_RELATIVE_ERROR: f64 = 0.01;

/// Default lower end of the value range for bounded digests.
pub const DEFAULT_MIN_VALUE: f64 = 1.0e-6;

/// Default upper end of the value range for bounded digests.
pub const DEFAULT_MAX_VALUE: f64 = 1.0e6;

/// Range of values that a digest is sized for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValueRange {
    /// Values are clamped into `[min, max]`, and bucket storage is allocated up front.
    Bounded {
        /// Lower end of the range, within (0, 1).
        min: f64,

        /// Upper end of the range, within (1, `f64::MAX`).
        max: f64,
    },

    /// Any value within (0, `f64::MAX`) is accepted, and bucket storage grows on demand.
    Unbounded,
}

/// Validated digest parameters.
///
/// Parameters are the identity of a digest for the purpose of merging: two digests can only be merged if their
/// parameters are equal. Equality is exact, which makes it an equivalence relation, and parameters can be hashed, so
/// they can be used to group compatible digests together.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DigestParams {
    relative_error: NotNan<f64>,
    range: Option<(NotNan<f64>, NotNan<f64>)>,
}

impl DigestParams {
    /// Creates parameters for a bounded digest.
    ///
    /// # Errors
    ///
    /// If `min_value` is not within (0, 1), `max_value` is not within (1, `f64::MAX`), or `relative_error` is not
    /// within (0, 1), an error is returned. An error is also returned if the relative error is so small that either end
    /// of the range falls outside of the mapping's indexable values.
    pub fn bounded(min_value: f64, max_value: f64, relative_error: f64) -> Result<Self, DigestError> {
        let relative_error = validate_relative_error(relative_error)?;

        // Written so that NaN fails the check.
        ensure!(min_value > 0.0 && min_value < 1.0, InvalidMinValue { value: min_value });
        ensure!(max_value > 1.0 && max_value < f64::MAX, InvalidMaxValue { value: max_value });

        // Both ends of the range must map to keys that fit in an `i32`.
        let mapping = LogGammaMapping::new(relative_error.into_inner());
        ensure!(
            min_value >= mapping.min_indexable_value(),
            InvalidMinValue { value: min_value }
        );
        ensure!(
            max_value <= mapping.max_indexable_value(),
            InvalidMaxValue { value: max_value }
        );

        let min_value = NotNan::new(min_value).map_err(|_| DigestError::InvalidMinValue { value: min_value })?;
        let max_value = NotNan::new(max_value).map_err(|_| DigestError::InvalidMaxValue { value: max_value })?;

        Ok(Self {
            relative_error,
            range: Some((min_value, max_value)),
        })
    }

    /// Creates parameters for an unbounded digest.
    ///
    /// # Errors
    ///
    /// If `relative_error` is not within (0, 1), an error is returned.
    pub fn unbounded(relative_error: f64) -> Result<Self, DigestError> {
        Ok(Self {
            relative_error: validate_relative_error(relative_error)?,
            range: None,
        })
    }

    /// Returns a copy of these parameters with a different relative error, keeping the value range.
    ///
    /// The value range is validated again, as a smaller relative error can leave it too wide to be indexed.
    pub(crate) fn with_relative_error(&self, relative_error: f64) -> Result<Self, DigestError> {
        match self.range {
            Some((min, max)) => Self::bounded(min.into_inner(), max.into_inner(), relative_error),
            None => Self::unbounded(relative_error),
        }
    }

    /// Returns the target maximum relative error.
    pub fn relative_error(&self) -> f64 {
        self.relative_error.into_inner()
    }

    /// Returns the value range.
    pub fn range(&self) -> ValueRange {
        match self.range {
            Some((min, max)) => ValueRange::Bounded {
                min: min.into_inner(),
                max: max.into_inner(),
            },
            None => ValueRange::Unbounded,
        }
    }

    /// Returns `true` if these parameters describe a bounded digest.
    pub fn is_bounded(&self) -> bool {
        self.range.is_some()
    }

    /// Returns the index mapping fitted to the relative error.
    pub fn mapping(&self) -> LogGammaMapping {
        LogGammaMapping::new(self.relative_error())
    }

    /// Returns the bucket growth factor.
    pub fn gamma(&self) -> f64 {
        self.mapping().gamma()
    }

    /// Returns the natural logarithm of the bucket growth factor.
    pub fn gamma_ln(&self) -> f64 {
        self.mapping().gamma_ln()
    }

    /// Returns the shape of the bucket storage required to cover the value range.
    ///
    /// Returns `None` for unbounded parameters, as their storage grows on demand.
    pub fn bucket_shape(&self) -> Option<BucketShape> {
        let (min, max) = self.range?;
        let mapping = self.mapping();
        Some(BucketShape::covering(
            mapping.key(min.into_inner()),
            mapping.key(max.into_inner()),
        ))
    }

    /// Returns the number of buckets required to cover the value range.
    ///
    /// Returns `None` for unbounded parameters.
    pub fn bucket_capacity(&self) -> Option<usize> {
        self.bucket_shape().map(|shape| shape.len())
    }
}

impl fmt::Display for DigestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relative error {}%", self.relative_error() * 100.0)?;
        match self.range {
            Some((min, max)) => write!(f, " over [{}, {}]", min, max),
            None => write!(f, " (unbounded)"),
        }
    }
}

impl Default for DigestParams {
    fn default() -> Self {
        Self {
            relative_error: NotNan::new(DEFAULT_RELATIVE_ERROR).expect("default relative error is not NaN"),
            range: None,
        }
    }
}

fn validate_relative_error(relative_error: f64) -> Result<NotNan<f64>, DigestError> {
    ensure!(
        relative_error > 0.0 && relative_error < 1.0,
        InvalidRelative { value: relative_error }
    );

    NotNan::new(relative_error).map_err(|_| DigestError::InvalidRelativeError { value: relative_error })
}
