/// A running sum using Kahan (compensated) summation.
///
/// The compensation term captures the low-order bits lost by each addition and feeds them back into the next one, which
/// keeps the accumulated floating-point error bounded regardless of how many values are added.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    /// Creates a sum from a previously captured sum and compensation term.
    pub fn from_parts(sum: f64, compensation: f64) -> Self {
        Self { sum, compensation }
    }

    /// Returns the current sum.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Returns the current compensation term.
    pub fn compensation(&self) -> f64 {
        self.compensation
    }

    /// Adds a value to the sum.
    #[inline]
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    /// Merges another sum into this one.
    ///
    /// The other sum is folded in as a single addend: its own compensation term is not carried over.
    pub fn merge(&mut self, other: &CompensatedSum) {
        self.add(other.sum);
    }
}
