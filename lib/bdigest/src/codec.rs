//! Binary encoding.
//!
//! A digest is encoded as a fixed 64-byte header followed by its bucket counters, with every field little-endian:
//!
//! | offset | field           | type |
//! |--------|-----------------|------|
//! | 0      | relative error  | f64  |
//! | 8      | minimum         | f64  |
//! | 16     | maximum         | f64  |
//! | 24     | sum             | f64  |
//! | 32     | compensation    | f64  |
//! | 40     | negative count  | u64  |
//! | 48     | positive count  | u64  |
//! | 56     | negative length | u32  |
//! | 60     | positive length | u32  |
//!
//! The negative-key counters follow the header, then the positive-key counters, as `u64` each, nearest to key zero
//! first. The value range of bounded digests is not part of the encoding.

use bytes::{Buf, BufMut};
use snafu::{ensure, Snafu};
use tracing::debug;

use crate::{BucketShape, BucketStore, CompensatedSum, Digest, DigestParams, ValueRange};

/// Length of the encoded header, in bytes.
pub const HEADER_LEN: usize = 64;

const COUNTER_LEN: u64 = 8;

/// Errors that can occur when decoding a digest.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum DecodeError {
    /// The buffer is too small to hold the header.
    #[snafu(display("Buffer of {} bytes is too small to hold a digest header ({} bytes).", len, HEADER_LEN))]
    BufferTooSmall {
        /// Length of the buffer.
        len: usize,
    },

    /// The encoded relative error is not within (0, 1), or is too small for the value range of a bounded digest to be
    /// indexed.
    #[snafu(display("Encoded relative error must be between 0.0 and 1.0 exclusive (got {}).", value))]
    InvalidRelativeError {
        /// The encoded relative error.
        value: f64,
    },

    /// The bytes following the header do not match the encoded bucket array lengths.
    #[snafu(display("Expected {} bytes of bucket counters, got {}.", expected, actual))]
    PayloadLengthMismatch {
        /// Number of bytes implied by the bucket array lengths.
        expected: u64,
        /// Number of bytes following the header.
        actual: u64,
    },

    /// An encoded total count does not match the sum of its bucket counters.
    #[snafu(display("Encoded total count of {} does not match the bucket counters.", declared))]
    CountMismatch {
        /// The encoded total count.
        declared: u64,
    },

    /// The encoded minimum and maximum are not ordered, or are NaN.
    #[snafu(display("Encoded extremes are invalid (min {}, max {}).", min, max))]
    InvalidExtremes {
        /// The encoded minimum.
        min: f64,
        /// The encoded maximum.
        max: f64,
    },

    /// The encoded bucket arrays do not fit in the pre-sized storage of a bounded digest.
    #[snafu(display("Encoded buckets {:?} exceed the bounded digest's capacity {:?}.", shape, capacity))]
    ExceedsCapacity {
        /// Shape of the encoded bucket arrays.
        shape: BucketShape,
        /// Shape of the bounded digest's storage.
        capacity: BucketShape,
    },

    /// The encoded extremes lie outside of the value range of a bounded digest.
    #[snafu(display(
        "Encoded extremes [{}, {}] lie outside of the bounded digest's range [{}, {}].",
        min,
        max,
        range_min,
        range_max
    ))]
    OutsideRange {
        /// The encoded minimum.
        min: f64,
        /// The encoded maximum.
        max: f64,
        /// Lower end of the bounded digest's range.
        range_min: f64,
        /// Upper end of the bounded digest's range.
        range_max: f64,
    },
}

/// Decoded digest state that has passed every check that does not depend on the decode target.
struct Decoded {
    relative_error: f64,
    min: f64,
    max: f64,
    sum: CompensatedSum,
    store: BucketStore,
}

impl Digest {
    /// Returns the number of bytes needed to encode this digest.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.store.len() * COUNTER_LEN as usize
    }

    /// Encodes this digest into a new buffer.
    ///
    /// # Panics
    ///
    /// Panics if either bucket array holds more than `u32::MAX` counters.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_to(&mut buf);
        buf
    }

    /// Encodes this digest into the given buffer.
    ///
    /// # Panics
    ///
    /// Panics if either bucket array holds more than `u32::MAX` counters.
    pub fn encode_to<B: BufMut>(&self, buf: &mut B) {
        let neg = self.store.neg();
        let pos = self.store.pos();
        let neg_len = u32::try_from(neg.len()).expect("negative bucket array length exceeds u32::MAX");
        let pos_len = u32::try_from(pos.len()).expect("positive bucket array length exceeds u32::MAX");

        buf.put_f64_le(self.relative_error());
        buf.put_f64_le(self.min);
        buf.put_f64_le(self.max);
        buf.put_f64_le(self.sum.sum());
        buf.put_f64_le(self.sum.compensation());
        buf.put_u64_le(self.store.num_neg());
        buf.put_u64_le(self.store.num_pos());
        buf.put_u32_le(neg_len);
        buf.put_u32_le(pos_len);

        for n in neg.iter().chain(pos) {
            buf.put_u64_le(*n);
        }
    }

    /// Decodes a digest.
    ///
    /// The value range of bounded digests is not encoded, so the decoded digest is always unbounded. As parameters must
    /// match exactly for a merge, a digest decoded this way cannot be merged into a bounded digest, even the one it was
    /// encoded from. Use [`decode_into`][Self::decode_into] on a digest with the expected range instead.
    ///
    /// # Errors
    ///
    /// If the buffer does not hold a well-formed digest, an error is returned.
    pub fn decode(bytes: &[u8]) -> Result<Digest, DecodeError> {
        let decoded = read(bytes).inspect_err(|e| debug!(error = %e, "Failed to decode digest."))?;

        let params = DigestParams::unbounded(decoded.relative_error).map_err(|_| DecodeError::InvalidRelativeError {
            value: decoded.relative_error,
        })?;

        Ok(assemble(params, decoded))
    }

    /// Decodes a digest in place, replacing the contents of this digest.
    ///
    /// The relative error is taken from the encoding, while the value range of this digest is kept. When this digest is
    /// bounded, the encoded buckets must fit within its storage and the encoded extremes must lie within its range.
    ///
    /// # Errors
    ///
    /// If the buffer does not hold a well-formed digest, or the encoded digest does not fit this digest's range, an
    /// error is returned and this digest is left unchanged.
    pub fn decode_into(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        let decoded = self
            .check_decoded(bytes)
            .inspect_err(|e| debug!(params = %self.params, error = %e, "Failed to decode digest in place."))?;

        *self = decoded;
        Ok(())
    }

    fn check_decoded(&self, bytes: &[u8]) -> Result<Digest, DecodeError> {
        let mut decoded = read(bytes)?;

        let params = self
            .params
            .with_relative_error(decoded.relative_error)
            .map_err(|_| DecodeError::InvalidRelativeError {
                value: decoded.relative_error,
            })?;

        if let Some(capacity) = params.bucket_shape() {
            let shape = decoded.store.shape();
            ensure!(shape.fits_within(&capacity), ExceedsCapacity { shape, capacity });

            if let ValueRange::Bounded { min, max } = params.range() {
                let is_empty = decoded.store.total_count() == 0;
                ensure!(
                    is_empty || (decoded.min >= min && decoded.max <= max),
                    OutsideRange {
                        min: decoded.min,
                        max: decoded.max,
                        range_min: min,
                        range_max: max,
                    }
                );
            }

            decoded.store.grow_to(capacity);
        }

        Ok(assemble(params, decoded))
    }
}

fn read(bytes: &[u8]) -> Result<Decoded, DecodeError> {
    ensure!(bytes.len() >= HEADER_LEN, BufferTooSmall { len: bytes.len() });

    let mut buf = bytes;
    let relative_error = buf.get_f64_le();
    let min = buf.get_f64_le();
    let max = buf.get_f64_le();
    let sum = buf.get_f64_le();
    let compensation = buf.get_f64_le();
    let num_neg = buf.get_u64_le();
    let num_pos = buf.get_u64_le();
    let neg_len = buf.get_u32_le();
    let pos_len = buf.get_u32_le();

    ensure!(
        relative_error > 0.0 && relative_error < 1.0,
        InvalidRelative { value: relative_error }
    );

    let expected = (u64::from(neg_len) + u64::from(pos_len)) * COUNTER_LEN;
    let actual = buf.remaining() as u64;
    ensure!(expected == actual, PayloadLengthMismatch { expected, actual });

    let neg = read_counters(&mut buf, neg_len);
    let pos = read_counters(&mut buf, pos_len);
    ensure!(checked_total(&neg) == Some(num_neg), CountMismatch { declared: num_neg });
    ensure!(checked_total(&pos) == Some(num_pos), CountMismatch { declared: num_pos });

    let count = num_neg.checked_add(num_pos);
    ensure!(count.is_some(), CountMismatch { declared: num_pos });

    let (min, max) = if count == Some(0) {
        (f64::INFINITY, f64::NEG_INFINITY)
    } else {
        // NaN fails the comparison.
        ensure!(min <= max, InvalidExtremes { min, max });
        (min, max)
    };

    Ok(Decoded {
        relative_error,
        min,
        max,
        sum: CompensatedSum::from_parts(sum, compensation),
        store: BucketStore::from_parts(neg, pos, num_neg, num_pos),
    })
}

fn read_counters(buf: &mut &[u8], len: u32) -> Vec<u64> {
    (0..len).map(|_| buf.get_u64_le()).collect()
}

fn checked_total(counters: &[u64]) -> Option<u64> {
    counters.iter().try_fold(0u64, |total, n| total.checked_add(*n))
}

fn assemble(params: DigestParams, decoded: Decoded) -> Digest {
    Digest {
        params,
        mapping: params.mapping(),
        store: decoded.store,
        sum: decoded.sum,
        min: decoded.min,
        max: decoded.max,
    }
}
