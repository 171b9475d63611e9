#![allow(dead_code)]

use bdigest::Digest;
use dhat::HeapStats;
use rand::SeedableRng;
use rand_distr::{Distribution, LogNormal, Normal, Pareto, Uniform};

const SEED: u64 = 0xC0FFEE;

/// Generates latency-like samples, in microseconds, between 15 milliseconds and 10 seconds.
pub fn make_points(size: usize) -> Vec<f64> {
    let distribution = Pareto::new(1.0, 1.0).expect("pareto distribution should be valid");

    let mut rng = rand::rngs::SmallRng::seed_from_u64(SEED);
    distribution
        .sample_iter(&mut rng)
        // Scale by 10,000 to get microseconds.
        .map(|n| n * 10_000.0)
        .filter(|n| *n > 15_000.0 && *n < 10_000_000.0)
        .take(size)
        .collect::<Vec<_>>()
}

/// Draws `size` strictly positive samples from the given distribution.
pub fn sample<D: Distribution<f64>>(distribution: D, size: usize) -> Vec<f64> {
    let mut rng = rand::rngs::SmallRng::seed_from_u64(SEED);
    distribution
        .sample_iter(&mut rng)
        .filter(|n| *n > 0.0)
        .take(size)
        .collect::<Vec<_>>()
}

/// Named sample sets covering narrow, symmetric, and heavy-tailed shapes.
pub fn distributions(size: usize) -> Vec<(&'static str, Vec<f64>)> {
    vec![
        (
            "uniform",
            sample(Uniform::new(1.0, 1000.0).expect("uniform distribution should be valid"), size),
        ),
        (
            "normal",
            sample(Normal::new(500.0, 100.0).expect("normal distribution should be valid"), size),
        ),
        (
            "lognormal",
            sample(LogNormal::new(0.0, 2.0).expect("lognormal distribution should be valid"), size),
        ),
        ("pareto", make_points(size)),
    ]
}

pub fn digest_from(mut digest: Digest, values: &[f64]) -> Digest {
    digest.add_many(values).expect("values should be accepted");
    digest
}

/// Returns the exact value at quantile `q` of `sorted`, with ranks computed as `floor(1 + q * (n - 1))`.
pub fn exact_quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    let rank = (1.0 + q * (n - 1) as f64).floor() as usize;
    sorted[rank.clamp(1, n) - 1]
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

pub fn assert_within_relative_error(alpha: f64, actual: f64, expected: f64, context: &str) {
    let err = (actual - expected).abs() / expected;
    assert!(
        err <= alpha * (1.0 + 1.0e-9),
        "{}: expected {} within {} relative error, got {} ({} relative error)",
        context,
        expected,
        alpha,
        actual,
        err
    );
}

#[non_exhaustive]
pub struct MathableHeapStats {
    pub total_blocks: u64,
    pub total_bytes: u64,
    pub curr_blocks: usize,
    pub curr_bytes: usize,
}

impl From<HeapStats> for MathableHeapStats {
    fn from(stats: HeapStats) -> Self {
        Self {
            total_blocks: stats.total_blocks,
            total_bytes: stats.total_bytes,
            curr_blocks: stats.curr_blocks,
            curr_bytes: stats.curr_bytes,
        }
    }
}

impl std::ops::Sub for MathableHeapStats {
    type Output = MathableHeapStats;

    fn sub(self, rhs: MathableHeapStats) -> Self::Output {
        MathableHeapStats {
            total_blocks: self.total_blocks - rhs.total_blocks,
            total_bytes: self.total_bytes - rhs.total_bytes,
            curr_blocks: self.curr_blocks - rhs.curr_blocks,
            curr_bytes: self.curr_bytes - rhs.curr_bytes,
        }
    }
}
