//! Mergeable quantile estimation with guaranteed relative error.
//!
//! A [`Digest`] tracks the distribution of a stream of non-negative values using histograms with exponentially sized
//! buckets. Every bucket spans a factor of `gamma = (1 + alpha) / (1 - alpha)`, so any quantile other than the exact
//! minimum and maximum is reported with a relative error of at most `alpha`. Memory usage depends only on the logarithm
//! of the tracked value range and is inversely proportional to `alpha`: halving the error doubles the bucket count.
//!
//! Digests built with identical parameters can be merged without any loss of accuracy, which makes them a good fit for
//! per-shard aggregation that is periodically folded together, and they can be shipped around using a compact binary
//! encoding (see [`Digest::encode`] and [`Digest::decode`]).
//!
//! # Example
//!
//! ```
//! use bdigest::Digest;
//!
//! let mut digest = Digest::with_relative_error(0.01).unwrap();
//! for i in 1..=1000 {
//!     digest.add(f64::from(i)).unwrap();
//! }
//!
//! let median = digest.quantile(0.5).unwrap();
//! assert!((median - 500.5).abs() / 500.5 <= 0.01);
//! assert_eq!(digest.quantile(0.0).unwrap(), 1.0);
//! assert_eq!(digest.quantile(1.0).unwrap(), 1000.0);
//! ```
//!
//! # Value ranges
//!
//! Digests come in two variants, selected by [`ValueRange`]:
//!
//! - **bounded** ([`Digest::new`], [`Digest::with_relative_error`]): buckets are allocated once to cover a fixed range,
//!   and values outside of that range are clamped into it. Insertion never allocates.
//! - **unbounded** ([`Digest::unbounded`]): buckets grow on demand to cover any finite positive value, and values that
//!   cannot be represented are rejected.
//!
//! # Features
//!
//! This crate exposes a single feature, `serde`, which allows [`DigestConfiguration`] to be deserialized from
//! configuration sources.
#![deny(warnings)]
#![deny(missing_docs)]

mod codec;
pub use self::codec::{DecodeError, HEADER_LEN};

mod common;

mod config;
pub use self::config::DigestConfiguration;

mod digest;
pub use self::digest::Digest;

mod error;
pub use self::error::DigestError;

mod mapping;
pub use self::mapping::LogGammaMapping;

mod params;
pub use self::params::*;

mod rank;
pub use self::rank::RankIndex;

mod store;
pub use self::store::{BucketShape, BucketStore};

mod sum;
pub use self::sum::CompensatedSum;
