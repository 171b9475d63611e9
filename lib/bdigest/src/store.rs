//! Bucket storage.

/// Lengths of the negative-key and positive-key bucket arrays.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BucketShape {
    /// Number of buckets for keys less than or equal to zero.
    pub neg: usize,

    /// Number of buckets for keys greater than zero.
    pub pos: usize,
}

impl BucketShape {
    /// Returns the shape needed to hold every key between `min_key` and `max_key`, inclusive.
    pub fn covering(min_key: i32, max_key: i32) -> Self {
        let neg = if min_key <= 0 { min_key.unsigned_abs() as usize + 1 } else { 0 };
        let pos = if max_key > 0 { max_key as usize } else { 0 };
        Self { neg, pos }
    }

    /// Returns the total number of buckets.
    pub fn len(&self) -> usize {
        self.neg + self.pos
    }

    /// Returns `true` if there are no buckets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if both bucket arrays of `self` are no longer than those of `other`.
    pub fn fits_within(&self, other: &BucketShape) -> bool {
        self.neg <= other.neg && self.pos <= other.pos
    }
}

/// Bucket counters, split around key zero.
///
/// Keys less than or equal to zero (values up to 1.0) are held in the negative-key array, where key `k` lives at index
/// `-k`. Keys greater than zero are held in the positive-key array, where key `k` lives at index `k - 1`. In both
/// arrays, index zero is the bucket nearest to a value of 1.0.
///
/// Arrays only ever grow, and only when a key outside of the current shape is added. A store created with a shape that
/// covers every key it will see is never resized.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BucketStore {
    neg: Vec<u64>,
    pos: Vec<u64>,
    num_neg: u64,
    num_pos: u64,
}

impl BucketStore {
    /// Creates an empty store with no buckets allocated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given shape allocated up front.
    pub fn with_shape(shape: BucketShape) -> Self {
        Self {
            neg: vec![0; shape.neg],
            pos: vec![0; shape.pos],
            num_neg: 0,
            num_pos: 0,
        }
    }

    /// Creates a store from its raw parts.
    ///
    /// The totals must match the sum of their respective bucket arrays.
    pub(crate) fn from_parts(neg: Vec<u64>, pos: Vec<u64>, num_neg: u64, num_pos: u64) -> Self {
        debug_assert_eq!(neg.iter().sum::<u64>(), num_neg);
        debug_assert_eq!(pos.iter().sum::<u64>(), num_pos);

        Self {
            neg,
            pos,
            num_neg,
            num_pos,
        }
    }

    /// Returns the current shape of the store.
    pub fn shape(&self) -> BucketShape {
        BucketShape {
            neg: self.neg.len(),
            pos: self.pos.len(),
        }
    }

    /// Returns the number of buckets currently allocated.
    pub fn len(&self) -> usize {
        self.neg.len() + self.pos.len()
    }

    /// Returns `true` if no buckets are allocated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bucket counters for keys less than or equal to zero, nearest to key zero first.
    pub fn neg(&self) -> &[u64] {
        &self.neg
    }

    /// Returns the bucket counters for keys greater than zero, nearest to key one first.
    pub fn pos(&self) -> &[u64] {
        &self.pos
    }

    /// Returns the total count of the negative-key buckets.
    pub fn num_neg(&self) -> u64 {
        self.num_neg
    }

    /// Returns the total count of the positive-key buckets.
    pub fn num_pos(&self) -> u64 {
        self.num_pos
    }

    /// Returns the total count across all buckets.
    pub fn total_count(&self) -> u64 {
        self.num_neg + self.num_pos
    }

    /// Adds `n` to the bucket with the given key, growing the store if necessary.
    ///
    /// The total count must not overflow `u64`. [`Digest`][crate::Digest] checks this before adding values.
    pub fn add(&mut self, key: i32, n: u64) {
        if key <= 0 {
            let idx = key.unsigned_abs() as usize;
            grow(&mut self.neg, idx + 1);
            self.neg[idx] += n;
            self.num_neg += n;
        } else {
            let idx = key as usize - 1;
            grow(&mut self.pos, idx + 1);
            self.pos[idx] += n;
            self.num_pos += n;
        }
    }

    /// Merges another store into this one, growing this store only if the other store is larger.
    ///
    /// The combined total count must not overflow `u64`.
    pub fn merge(&mut self, other: &BucketStore) {
        merge_buckets(&mut self.neg, &other.neg);
        merge_buckets(&mut self.pos, &other.pos);
        self.num_neg += other.num_neg;
        self.num_pos += other.num_pos;
    }

    /// Returns the key of the bucket holding the observation at the given rank.
    ///
    /// Ranks are 1-indexed, so rank 1 is the smallest observation. Returns `None` if the rank is zero or exceeds the
    /// total count.
    pub fn key_at_rank(&self, rank: u64) -> Option<i32> {
        if rank == 0 || rank > self.total_count() {
            return None;
        }

        if rank <= self.num_neg {
            // The most negative key sits at the end of the array, so walk it backwards.
            let mut cumulative = 0u64;
            for (idx, &count) in self.neg.iter().enumerate().rev() {
                cumulative += count;
                if cumulative >= rank {
                    return Some(-(idx as i32));
                }
            }
        } else {
            let rank = rank - self.num_neg;
            let mut cumulative = 0u64;
            for (idx, &count) in self.pos.iter().enumerate() {
                cumulative += count;
                if cumulative >= rank {
                    return Some(idx as i32 + 1);
                }
            }
        }

        None
    }

    /// Returns an iterator over all non-empty buckets as `(key, count)` pairs, in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, u64)> + '_ {
        let neg = self.neg.iter().enumerate().rev().map(|(idx, &n)| (-(idx as i32), n));
        let pos = self.pos.iter().enumerate().map(|(idx, &n)| (idx as i32 + 1, n));
        neg.chain(pos).filter(|(_, n)| *n > 0)
    }

    /// Resets every counter to zero.
    ///
    /// When a shape is given, storage is kept and resized to exactly that shape. Otherwise, all storage is released.
    pub fn reset(&mut self, shape: Option<BucketShape>) {
        match shape {
            Some(shape) => {
                self.neg.clear();
                self.neg.resize(shape.neg, 0);
                self.pos.clear();
                self.pos.resize(shape.pos, 0);
            }
            None => {
                self.neg = Vec::new();
                self.pos = Vec::new();
            }
        }
        self.num_neg = 0;
        self.num_pos = 0;
    }

    /// Grows the store to at least the given shape.
    pub(crate) fn grow_to(&mut self, shape: BucketShape) {
        grow(&mut self.neg, shape.neg);
        grow(&mut self.pos, shape.pos);
    }
}

fn grow(buckets: &mut Vec<u64>, len: usize) {
    if buckets.len() < len {
        tracing::trace!(from = buckets.len(), to = len, "Growing bucket array.");
        buckets.resize(len, 0);
    }
}

fn merge_buckets(ours: &mut Vec<u64>, theirs: &[u64]) {
    grow(ours, theirs.len());
    for (ours, theirs) in ours.iter_mut().zip(theirs) {
        *ours += *theirs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_covering() {
        assert_eq!(BucketShape::covering(-3, 4), BucketShape { neg: 4, pos: 4 });
        assert_eq!(BucketShape::covering(0, 1), BucketShape { neg: 1, pos: 1 });
        assert_eq!(BucketShape::covering(2, 5), BucketShape { neg: 0, pos: 5 });
        assert_eq!(BucketShape::covering(-5, -2), BucketShape { neg: 6, pos: 0 });
        assert_eq!(BucketShape::covering(-3, 4).len(), 8);
    }

    #[test]
    fn test_add_splits_around_zero() {
        let mut store = BucketStore::new();
        store.add(0, 1);
        store.add(-2, 3);
        store.add(1, 2);
        store.add(4, 1);

        assert_eq!(store.neg(), &[1, 0, 3]);
        assert_eq!(store.pos(), &[2, 0, 0, 1]);
        assert_eq!(store.num_neg(), 4);
        assert_eq!(store.num_pos(), 3);
        assert_eq!(store.total_count(), 7);
    }

    #[test]
    fn test_presized_store_does_not_grow() {
        let shape = BucketShape::covering(-10, 10);
        let mut store = BucketStore::with_shape(shape);

        for key in -10..=10 {
            store.add(key, 1);
        }

        assert_eq!(store.shape(), shape);
        assert_eq!(store.total_count(), 21);
    }

    #[test]
    fn test_key_at_rank() {
        let mut store = BucketStore::new();
        store.add(-2, 3);
        store.add(0, 1);
        store.add(3, 2);

        assert_eq!(store.key_at_rank(0), None);
        assert_eq!(store.key_at_rank(1), Some(-2));
        assert_eq!(store.key_at_rank(3), Some(-2));
        assert_eq!(store.key_at_rank(4), Some(0));
        assert_eq!(store.key_at_rank(5), Some(3));
        assert_eq!(store.key_at_rank(6), Some(3));
        assert_eq!(store.key_at_rank(7), None);
    }

    #[test]
    fn test_iter_ascending() {
        let mut store = BucketStore::new();
        store.add(2, 5);
        store.add(-1, 1);
        store.add(0, 2);

        assert_eq!(store.iter().collect::<Vec<_>>(), vec![(-1, 1), (0, 2), (2, 5)]);
    }

    #[test]
    fn test_merge() {
        let mut store1 = BucketStore::new();
        store1.add(-1, 2);
        store1.add(1, 1);

        let mut store2 = BucketStore::new();
        store2.add(-3, 1);
        store2.add(1, 4);
        store2.add(2, 3);

        store1.merge(&store2);

        assert_eq!(store1.neg(), &[0, 2, 0, 1]);
        assert_eq!(store1.pos(), &[5, 3]);
        assert_eq!(store1.total_count(), 11);

        // The merged-from store is untouched.
        assert_eq!(store2.total_count(), 8);
    }

    #[test]
    fn test_reset() {
        let shape = BucketShape::covering(-2, 2);
        let mut store = BucketStore::with_shape(shape);
        store.add(-2, 1);
        store.add(2, 1);

        store.reset(Some(shape));
        assert_eq!(store.shape(), shape);
        assert_eq!(store.total_count(), 0);
        assert!(store.iter().next().is_none());

        store.add(7, 1);
        store.reset(None);
        assert!(store.is_empty());
        assert_eq!(store.total_count(), 0);
    }
}
