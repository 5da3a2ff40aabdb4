//! # Cadence Performance Benchmarks
//!
//! ## Benchmark Categories
//!
//! - **Model**: Binning, base matrix and phase matrix construction
//! - **Generation**: Chain simulation and full playlist generation
//! - **Analytics**: Hitting times and strategy comparison
//! - **Database**: Catalog import and load
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench model
//! cargo bench generation
//! ```

use cadence::analytics::{compare_strategies, hitting_times};
use cadence::model::{base_transition, phase_transition_for};
use cadence::{
    classify_catalog, db, simulate, PhaseWeights, PlaylistGenerator, Song, SongRecord, StateRanges, WorkoutState,
    START_STATE,
};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use tempfile::TempDir;

/// Records with tempos spread over 70-200 BPM
fn create_test_records(count: usize) -> Vec<SongRecord> {
    let mut rng = StdRng::seed_from_u64(count as u64);
    (0..count)
        .map(|i| SongRecord::new(format!("track-{i:05}"), format!("Song {i}"), "Bench Artist", rng.gen_range(70.0..200.0)))
        .collect()
}

fn create_test_catalog(count: usize) -> Vec<Song> {
    classify_catalog(create_test_records(count), &StateRanges::default()).songs
}

/// Benchmark transition model construction
fn benchmark_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("model");
    let ranges = StateRanges::default();

    for size in [100, 1000, 10_000].iter() {
        let records = create_test_records(*size);
        group.bench_with_input(BenchmarkId::new("classify_catalog", size), &records, |b, records| {
            b.iter_batched(
                || records.clone(),
                |records| classify_catalog(black_box(records), &ranges),
                BatchSize::SmallInput,
            )
        });

        let catalog = create_test_catalog(*size);
        group.bench_with_input(BenchmarkId::new("base_transition", size), &catalog, |b, catalog| {
            b.iter(|| base_transition(black_box(catalog), black_box(12.0)))
        });
    }

    let base = base_transition(&create_test_catalog(1000), 12.0).expect("valid tau");
    let weights = PhaseWeights::default();
    group.bench_function("phase_transition", |b| {
        b.iter(|| phase_transition_for(black_box(&base), &weights, WorkoutState::PushPace))
    });

    group.finish();
}

/// Benchmark chain simulation and playlist generation
fn benchmark_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    let generator = PlaylistGenerator::default();
    let plan = cadence::plan::preset("progressive_build").expect("preset exists");

    let catalog = create_test_catalog(1000);
    let base = base_transition(&catalog, 12.0).expect("valid tau");
    let matrices = generator.slot_matrices(&base, &plan).expect("default weights cover every phase");
    group.bench_function("simulate_path", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| simulate(black_box(&matrices), START_STATE, &mut rng))
    });

    for size in [20, 1000, 10_000].iter() {
        let catalog = create_test_catalog(*size);
        group.bench_with_input(BenchmarkId::new("generate_playlist", size), &catalog, |b, catalog| {
            let mut rng = StdRng::seed_from_u64(2);
            b.iter(|| generator.generate_with_rng(black_box(catalog), &plan, &mut rng))
        });
    }

    group.finish();
}

/// Benchmark model analytics
fn benchmark_analytics(c: &mut Criterion) {
    let mut group = c.benchmark_group("analytics");
    let catalog = create_test_catalog(500);
    let base = base_transition(&catalog, 12.0).expect("valid tau");

    group.bench_function("hitting_times", |b| b.iter(|| hitting_times(black_box(&base), WorkoutState::Sprint)));

    let plan = cadence::plan::preset("default").expect("preset exists");
    let generator = PlaylistGenerator::default();
    let ranges = StateRanges::default();
    group.sample_size(20);
    group.bench_function("compare_strategies_100_trials", |b| {
        b.iter(|| compare_strategies(black_box(&catalog), &plan, &generator, &ranges, 100, 42))
    });

    group.finish();
}

/// Benchmark catalog store operations
fn benchmark_database(c: &mut Criterion) {
    let mut group = c.benchmark_group("database");
    let records = create_test_records(1000);

    group.bench_function("import_1000_records", |b| {
        b.iter_batched(
            || {
                let temp_dir = TempDir::new().expect("Failed to create temp directory");
                let conn = db::open(&temp_dir.path().join("bench.db")).expect("Failed to open database");
                (temp_dir, conn)
            },
            |(_temp_dir, mut conn)| db::import_records(&mut conn, black_box(&records), false),
            BatchSize::SmallInput,
        )
    });

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut conn = db::open(&temp_dir.path().join("bench.db")).expect("Failed to open database");
    db::import_records(&mut conn, &records, false).expect("Failed to import");
    group.bench_function("load_1000_records", |b| b.iter(|| db::load_records(black_box(&conn))));

    group.finish();
}

criterion_group!(benches, benchmark_model, benchmark_generation, benchmark_analytics, benchmark_database);

criterion_main!(benches);
