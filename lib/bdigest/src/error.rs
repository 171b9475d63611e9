use snafu::Snafu;

use crate::DigestParams;

/// Errors that can occur when building, updating, querying, or merging a digest.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum DigestError {
    /// The relative error was not within (0, 1).
    #[snafu(display("Relative error must be between 0.0 and 1.0 exclusive (got {}).", value))]
    InvalidRelativeError {
        /// The rejected relative error.
        value: f64,
    },

    /// The lower end of a bounded value range was not within (0, 1).
    #[snafu(display("Minimum value must be between 0.0 and 1.0 exclusive (got {}).", value))]
    InvalidMinValue {
        /// The rejected minimum value.
        value: f64,
    },

    /// The upper end of a bounded value range was not within (1, `f64::MAX`).
    #[snafu(display("Maximum value must be greater than 1.0 and less than f64::MAX (got {}).", value))]
    InvalidMaxValue {
        /// The rejected maximum value.
        value: f64,
    },

    /// A value could not be added to the digest.
    ///
    /// NaN, infinite, and negative values are never accepted. Unbounded digests additionally reject values outside of
    /// the mapping's indexable range, which excludes zero and values close to `f64::MAX`.
    #[snafu(display("Value {} cannot be added to the digest.", value))]
    InvalidValue {
        /// The rejected value.
        value: f64,
    },

    /// Adding values would overflow the digest's total count.
    #[snafu(display("Adding {} values would overflow the total count of {}.", n, count))]
    CountOverflow {
        /// Number of values being added.
        n: u64,
        /// Total count of the digest.
        count: u64,
    },

    /// The requested quantile was not within [0, 1].
    #[snafu(display("Quantile must be between 0.0 and 1.0 inclusive (got {}).", q))]
    InvalidQuantile {
        /// The rejected quantile.
        q: f64,
    },

    /// Two digests with different parameters were merged.
    #[snafu(display("Cannot merge digest with {} into digest with {}.", theirs, ours))]
    IncompatibleDigests {
        /// Parameters of the digest being merged into.
        ours: DigestParams,
        /// Parameters of the digest being merged from.
        theirs: DigestParams,
    },
}
