use std::fmt;

use snafu::ensure;
use tracing::debug;

use crate::common::float_eq;
use crate::error::{CountOverflow, IncompatibleDigests, InvalidQuantile, InvalidValue};
use crate::{
    BucketStore, CompensatedSum, DigestError, DigestParams, LogGammaMapping, RankIndex, ValueRange, DEFAULT_MAX_VALUE,
    DEFAULT_MIN_VALUE,
};

/// A quantile digest with guaranteed relative error.
///
/// Values are counted in exponentially sized buckets, so that every bucket spans a constant factor (`gamma`) of values.
/// Quantiles are answered by finding the bucket holding the observation at the requested rank and returning a
/// representative value for that bucket, which is within a relative error of `alpha` of every value in the bucket. The
/// minimum and maximum are tracked exactly, and so `quantile(0.0)` and `quantile(1.0)` are exact.
///
/// Digests with equal [parameters][DigestParams] can be merged without any loss of accuracy: the merged digest answers
/// quantiles for the combined observations with the same error bound as either input.
///
/// The running sum of all values is tracked using compensated summation, which keeps floating-point error from piling
/// up over many insertions.
///
/// # Concurrency
///
/// A digest has no internal synchronization: every mutating operation takes `&mut self`. Sharing a digest between
/// threads requires wrapping it in a lock, or keeping one digest per thread and merging them together periodically.
#[derive(Clone, Debug)]
pub struct Digest {
    pub(crate) params: DigestParams,
    pub(crate) mapping: LogGammaMapping,
    pub(crate) store: BucketStore,
    pub(crate) sum: CompensatedSum,
    pub(crate) min: f64,
    pub(crate) max: f64,
}

impl Digest {
    /// Creates a digest sized for values within `[min_value, max_value]`, with the given relative error.
    ///
    /// All bucket storage is allocated up front. Values outside of the range are clamped into it when added.
    ///
    /// # Errors
    ///
    /// If `min_value` is not within (0, 1), `max_value` is not within (1, `f64::MAX`), or `relative_error` is not
    /// within (0, 1), an error is returned.
    pub fn new(min_value: f64, max_value: f64, relative_error: f64) -> Result<Self, DigestError> {
        DigestParams::bounded(min_value, max_value, relative_error).map(Self::from_params)
    }

    /// Creates a digest sized for values within `[1e-6, 1e6]`, with the given relative error.
    ///
    /// # Errors
    ///
    /// If `relative_error` is not within (0, 1), an error is returned.
    pub fn with_relative_error(relative_error: f64) -> Result<Self, DigestError> {
        Self::new(DEFAULT_MIN_VALUE, DEFAULT_MAX_VALUE, relative_error)
    }

    /// Creates a digest that accepts any finite positive value within the mapping's indexable range, with the given
    /// relative error.
    ///
    /// Bucket storage grows as needed to cover the values that are added, in proportion to the logarithm of the ratio
    /// between the largest and smallest value.
    ///
    /// # Errors
    ///
    /// If `relative_error` is not within (0, 1), an error is returned.
    pub fn unbounded(relative_error: f64) -> Result<Self, DigestError> {
        DigestParams::unbounded(relative_error).map(Self::from_params)
    }

    /// Creates an empty digest from validated parameters.
    pub fn from_params(params: DigestParams) -> Self {
        let mapping = params.mapping();
        let store = params.bucket_shape().map(BucketStore::with_shape).unwrap_or_default();

        debug!(
            %params,
            gamma = mapping.gamma(),
            gamma_ln = mapping.gamma_ln(),
            buckets = store.len(),
            "Created digest."
        );

        Self {
            params,
            mapping,
            store,
            sum: CompensatedSum::default(),
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Returns the parameters of this digest.
    pub fn params(&self) -> DigestParams {
        self.params
    }

    /// Returns the relative error guaranteed for quantiles.
    pub fn relative_error(&self) -> f64 {
        self.params.relative_error()
    }

    /// Returns the index mapping used by this digest.
    pub fn mapping(&self) -> &LogGammaMapping {
        &self.mapping
    }

    /// Returns the bucket counters of this digest.
    pub fn buckets(&self) -> &BucketStore {
        &self.store
    }

    /// Returns the number of bucket counters currently allocated.
    pub fn size(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no values have been added.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Returns the number of values added.
    pub fn count(&self) -> u64 {
        self.store.total_count()
    }

    /// Returns the sum of all values added.
    ///
    /// For bounded digests, this is the sum of the values after clamping.
    pub fn sum(&self) -> f64 {
        self.sum.sum()
    }

    /// Returns the running sum, along with its compensation term.
    pub fn compensated_sum(&self) -> CompensatedSum {
        self.sum
    }

    /// Returns the mean of all values added.
    ///
    /// Returns `None` if the digest is empty.
    pub fn mean(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.sum() / self.count() as f64)
    }

    /// Returns the exact minimum of all values added.
    ///
    /// Returns `None` if the digest is empty.
    pub fn min(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.min)
    }

    /// Returns the exact maximum of all values added.
    ///
    /// Returns `None` if the digest is empty.
    pub fn max(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.max)
    }

    /// Adds a value to the digest.
    ///
    /// # Errors
    ///
    /// If the value is NaN, infinite, or negative, an error is returned. Unbounded digests additionally reject values
    /// outside of the mapping's [indexable range][LogGammaMapping::is_indexable], which includes zero. If the total
    /// count would overflow, an error is returned. The digest is left unchanged on error.
    pub fn add(&mut self, value: f64) -> Result<(), DigestError> {
        let value = self.admit(value)?;
        self.reserve_count(1)?;
        self.record(value, 1);
        Ok(())
    }

    /// Adds a value to the digest `n` times.
    ///
    /// # Errors
    ///
    /// If the value would be rejected by [`add`][Self::add], or adding `n` values would overflow the total count, an
    /// error is returned and the digest is left unchanged.
    pub fn add_n(&mut self, value: f64, n: u64) -> Result<(), DigestError> {
        let value = self.admit(value)?;
        self.reserve_count(n)?;
        if n > 0 {
            self.record(value, n);
        }
        Ok(())
    }

    /// Adds many values to the digest.
    ///
    /// # Errors
    ///
    /// If any of the values would be rejected by [`add`][Self::add], an error is returned for the first such value and
    /// none of the values are added.
    pub fn add_many(&mut self, values: &[f64]) -> Result<(), DigestError> {
        let admitted = values
            .iter()
            .map(|value| self.admit(*value))
            .collect::<Result<Vec<_>, _>>()?;
        self.reserve_count(admitted.len() as u64)?;

        for value in admitted {
            self.record(value, 1);
        }
        Ok(())
    }

    fn admit(&self, value: f64) -> Result<f64, DigestError> {
        match self.params.range() {
            ValueRange::Bounded { min, max } => {
                ensure!(value.is_finite() && value >= 0.0, InvalidValue { value });
                Ok(value.clamp(min, max))
            }
            ValueRange::Unbounded => {
                ensure!(self.mapping.is_indexable(value), InvalidValue { value });
                Ok(value)
            }
        }
    }

    fn reserve_count(&self, n: u64) -> Result<(), DigestError> {
        let count = self.count();
        ensure!(count.checked_add(n).is_some(), CountOverflow { n, count });
        Ok(())
    }

    fn record(&mut self, value: f64, n: u64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }

        if n == 1 {
            self.sum.add(value);
        } else {
            self.sum.add(value * n as f64);
        }

        self.store.add(self.mapping.key(value), n);
    }

    /// Returns the value at the given quantile.
    ///
    /// The 0-quantile and 1-quantile are the exact minimum and maximum. All other quantiles are within the relative
    /// error of the digest. If the digest is empty, NaN is returned.
    ///
    /// # Errors
    ///
    /// If `q` is NaN or not within [0, 1], an error is returned.
    pub fn quantile(&self, q: f64) -> Result<f64, DigestError> {
        ensure!((0.0..=1.0).contains(&q), InvalidQuantile { q });

        let count = self.count();
        if count == 0 {
            return Ok(f64::NAN);
        }

        if q == 0.0 {
            return Ok(self.min);
        }
        if q == 1.0 {
            return Ok(self.max);
        }

        match self.store.key_at_rank(rank(count, q)) {
            Some(key) => Ok(self.mapping.value(key)),
            None => unreachable!("rank out of bounds on non-empty digest"),
        }
    }

    /// Returns the values at each of the given quantiles.
    ///
    /// This is equivalent to calling [`quantile`][Self::quantile] for each quantile, but only walks the buckets once.
    ///
    /// # Errors
    ///
    /// If any quantile is NaN or not within [0, 1], an error is returned.
    pub fn quantiles(&self, qs: &[f64]) -> Result<Vec<f64>, DigestError> {
        let index = self.rank_index();
        qs.iter().map(|q| index.quantile(*q)).collect()
    }

    /// Builds an index of cumulative bucket counts, for answering many quantile queries against a snapshot of this
    /// digest.
    pub fn rank_index(&self) -> RankIndex {
        RankIndex::new(self)
    }

    /// Merges another digest into this one.
    ///
    /// The other digest is not modified. Afterwards, this digest represents the observations of both digests, with the
    /// same relative error guarantee.
    ///
    /// # Errors
    ///
    /// If the digests have different parameters, or the combined count would overflow, an error is returned and neither
    /// digest is modified.
    pub fn merge(&mut self, other: &Digest) -> Result<(), DigestError> {
        if self.params != other.params {
            debug!(ours = %self.params, theirs = %other.params, "Rejected merge of incompatible digests.");
            return IncompatibleDigests {
                ours: self.params,
                theirs: other.params,
            }
            .fail();
        }
        self.reserve_count(other.count())?;

        if other.is_empty() {
            return Ok(());
        }

        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
        self.sum.merge(&other.sum);
        self.store.merge(&other.store);

        Ok(())
    }

    /// Removes all values from the digest.
    ///
    /// Bounded digests keep their bucket storage, while unbounded digests release it.
    pub fn clear(&mut self) {
        self.store.reset(self.params.bucket_shape());
        self.sum = CompensatedSum::default();
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }
}

impl Default for Digest {
    /// Creates an unbounded digest with 1% relative error.
    fn default() -> Self {
        Self::from_params(DigestParams::default())
    }
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
        // The sum can differ in its last bits between digests fed the same values in a different order, so it is
        // compared approximately.
        self.params == other.params
            && self.store == other.store
            && self.min == other.min
            && self.max == other.max
            && float_eq(self.sum(), other.sum())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest(err={}%)", self.relative_error() * 100.0)
    }
}

/// Returns the 1-indexed rank of the observation at quantile `q`, for a non-empty digest.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn rank(count: u64, q: f64) -> u64 {
    let rank = (1.0 + q * (count - 1) as f64).floor() as u64;
    rank.clamp(1, count)
}
