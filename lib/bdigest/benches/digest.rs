use bdigest::Digest;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::SeedableRng;
use rand_distr::{Distribution, Pareto};

fn make_points(size: usize) -> Vec<f64> {
    // Samples that roughly correspond to the latency of a typical web service, in microseconds, bottoming out at 15
    // milliseconds and tailing off up to 10 seconds.
    let distribution = Pareto::new(1.0, 1.0).expect("pareto distribution should be valid");
    let mut rng = rand::rngs::SmallRng::seed_from_u64(0xC0FFEE);
    distribution
        .sample_iter(&mut rng)
        .map(|n| n * 10_000.0)
        .filter(|n| *n > 15_000.0 && *n < 10_000_000.0)
        .take(size)
        .collect::<Vec<_>>()
}

fn bounded() -> Digest {
    Digest::new(1.0e-6, 1.0e8, 0.01).expect("parameters should be valid")
}

fn unbounded() -> Digest {
    Digest::unbounded(0.01).expect("parameters should be valid")
}

fn bench_insert(c: &mut Criterion) {
    let sizes = [1, 10, 100, 1_000, 10_000];

    for (name, make_digest) in [("bounded", bounded as fn() -> Digest), ("unbounded", unbounded)] {
        let mut group = c.benchmark_group(format!("{}/insert-single", name));
        for size in sizes.iter() {
            let vals = make_points(*size);
            group.throughput(Throughput::Elements(*size as u64));
            group.bench_with_input(BenchmarkId::from_parameter(size), &vals, |b, vals| {
                b.iter(|| {
                    let mut digest = make_digest();
                    for v in vals {
                        digest.add(*v).expect("value should be accepted");
                    }
                    digest
                });
            });
        }
        group.finish();

        let mut group = c.benchmark_group(format!("{}/insert-many", name));
        for size in sizes.iter() {
            let vals = make_points(*size);
            group.throughput(Throughput::Elements(*size as u64));
            group.bench_with_input(BenchmarkId::from_parameter(size), &vals, |b, vals| {
                b.iter(|| {
                    let mut digest = make_digest();
                    digest.add_many(vals).expect("values should be accepted");
                    digest
                });
            });
        }
        group.finish();
    }
}

fn bench_quantile(c: &mut Criterion) {
    let mut digest = bounded();
    digest.add_many(&make_points(10_000)).expect("values should be accepted");
    let qs = [0.5, 0.9, 0.95, 0.99, 0.999];

    let mut group = c.benchmark_group("quantile");
    group.bench_function("single", |b| b.iter(|| digest.quantile(0.99)));
    group.bench_function("repeated", |b| {
        b.iter(|| qs.iter().map(|q| digest.quantile(*q)).collect::<Result<Vec<_>, _>>())
    });
    group.bench_function("rank-index", |b| b.iter(|| digest.quantiles(&qs)));
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let points = make_points(10_000);
    let shards = points
        .chunks(1_000)
        .map(|chunk| {
            let mut digest = bounded();
            digest.add_many(chunk).expect("values should be accepted");
            digest
        })
        .collect::<Vec<_>>();

    c.bench_function("merge/10-shards", |b| {
        b.iter(|| {
            let mut merged = bounded();
            for shard in &shards {
                merged.merge(shard).expect("shards should be compatible");
            }
            merged
        })
    });
}

fn bench_codec(c: &mut Criterion) {
    let mut digest = unbounded();
    digest.add_many(&make_points(10_000)).expect("values should be accepted");
    let encoded = digest.encode();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("encode", |b| b.iter(|| digest.encode()));
    group.bench_function("decode", |b| b.iter(|| Digest::decode(&encoded)));
    group.bench_function("decode-into", |b| {
        let mut target = Digest::default();
        b.iter(|| target.decode_into(&encoded))
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_quantile, bench_merge, bench_codec);
criterion_main!(benches);
