use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sparselap::{
    ObjectCollection, SparseCostMatrix, SparseLapSolver, SparseLapTracker, TrackObject,
    TrackerConfig,
};

/// Random square sparse matrix with the requested density. The diagonal is
/// always present so a complete assignment exists.
fn make_matrix(size: usize, density: f64, rng: &mut ChaCha8Rng) -> SparseCostMatrix {
    let mut costs = Vec::new();
    let mut col_index = Vec::new();
    let mut row_count = Vec::new();
    for i in 0..size {
        let mut count = 0;
        for j in 0..size {
            if i == j || rng.gen_bool(density) {
                costs.push(rng.gen_range(1.0..100.0f64).floor());
                col_index.push(j);
                count += 1;
            }
        }
        row_count.push(count);
    }
    SparseCostMatrix::new(costs, col_index, row_count, size).unwrap()
}

/// Drifting points on a jittered grid, `n` per frame.
fn make_collection(n: usize, n_frames: i64, rng: &mut ChaCha8Rng) -> ObjectCollection {
    let mut coll = ObjectCollection::new();
    let side = (n as f64).sqrt().ceil() as usize;
    for frame in 0..n_frames {
        for k in 0..n {
            let x = (k % side) as f64 * 20.0 + frame as f64 + rng.gen_range(-1.0..1.0);
            let y = (k / side) as f64 * 20.0 + rng.gen_range(-1.0..1.0);
            coll.push(TrackObject::new(frame, x, y, 0.0, 1.0));
        }
    }
    coll
}

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver");
    for &(size, density) in &[(200, 0.01), (200, 0.1), (500, 0.01), (500, 0.05)] {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let matrix = make_matrix(size, density, &mut rng);
        group.bench_function(format!("{size}x{size}_density_{density}"), |b| {
            b.iter(|| black_box(SparseLapSolver::new(&matrix).solve().unwrap()));
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    for &n in &[50usize, 200, 500] {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let coll = make_collection(n, 20, &mut rng);
        group.bench_function(format!("{n}_objects_20_frames"), |b| {
            b.iter(|| {
                let tracker = SparseLapTracker::new(TrackerConfig::default()).unwrap();
                black_box(tracker.track(&coll).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_solver, bench_pipeline);
criterion_main!(benches);
