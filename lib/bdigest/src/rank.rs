use snafu::ensure;

use crate::digest::rank;
use crate::error::InvalidQuantile;
use crate::{Digest, DigestError, LogGammaMapping};

/// A snapshot of a digest's cumulative bucket counts.
///
/// Finding the bucket for a rank in a digest walks its buckets linearly. A `RankIndex` pays for that walk once, and
/// then answers each quantile with a binary search over the non-empty buckets, which suits answering many quantiles
/// against the same digest.
///
/// The index is detached from the digest it was built from, and does not reflect values added afterwards.
#[derive(Clone, Debug)]
pub struct RankIndex {
    mapping: LogGammaMapping,
    keys: Vec<i32>,
    cumulative: Vec<u64>,
    min: f64,
    max: f64,
}

impl RankIndex {
    pub(crate) fn new(digest: &Digest) -> Self {
        let mut keys = Vec::new();
        let mut cumulative = Vec::new();
        let mut total = 0;
        for (key, n) in digest.store.iter() {
            total += n;
            keys.push(key);
            cumulative.push(total);
        }

        Self {
            mapping: digest.mapping,
            keys,
            cumulative,
            min: digest.min,
            max: digest.max,
        }
    }

    /// Returns the number of values covered by the index.
    pub fn count(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Returns the number of non-empty buckets in the index.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the index covers no values.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the value at the given quantile.
    ///
    /// Results are identical to [`Digest::quantile`] on the digest the index was built from.
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

        let rank = rank(count, q);
        let idx = self.cumulative.partition_point(|&c| c < rank);
        match self.keys.get(idx) {
            Some(key) => Ok(self.mapping.value(*key)),
            None => unreachable!("rank out of bounds on non-empty rank index"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let index = Digest::default().rank_index();

        assert!(index.is_empty());
        assert_eq!(index.count(), 0);
        assert!(index.quantile(0.5).unwrap().is_nan());
        assert!(index.quantile(-1.0).is_err());
    }

    #[test]
    fn test_matches_digest() {
        let mut digest = Digest::with_relative_error(0.02).unwrap();
        for i in 0..5000 {
            digest.add(0.01 * f64::from(i % 997 + 1)).unwrap();
            digest.add(f64::from(i) * 3.5 + 1.0).unwrap();
        }

        let index = digest.rank_index();
        assert_eq!(index.count(), digest.count());
        assert!(index.len() < digest.size());

        for i in 0..=1000 {
            let q = f64::from(i) / 1000.0;
            assert_eq!(index.quantile(q).unwrap(), digest.quantile(q).unwrap(), "q{}", q);
        }
    }

    #[test]
    fn test_quantiles_batch() {
        let mut digest = Digest::unbounded(0.01).unwrap();
        digest.add_many(&[0.5, 1.0, 2.0, 4.0, 8.0]).unwrap();

        let qs = [0.0, 0.25, 0.5, 0.75, 1.0];
        let expected = qs.iter().map(|q| digest.quantile(*q).unwrap()).collect::<Vec<_>>();
        assert_eq!(digest.quantiles(&qs).unwrap(), expected);

        assert!(matches!(
            digest.quantiles(&[0.5, f64::NAN]),
            Err(DigestError::InvalidQuantile { .. })
        ));
    }

    #[test]
    fn test_detached_from_digest() {
        let mut digest = Digest::with_relative_error(0.01).unwrap();
        digest.add(1.0).unwrap();

        let index = digest.rank_index();
        digest.add(100.0).unwrap();

        assert_eq!(index.count(), 1);
        assert_eq!(index.quantile(1.0).unwrap(), 1.0);
    }
}
