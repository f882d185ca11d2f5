//! Board benchmarks for race_core.
//!
//! Run with: `cargo bench -p race_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use race_core::prelude::*;

fn board() -> RaceBoard {
    let mut rng = ChaCha8Rng::seed_from_u64(12345);
    let grid = Grid::generate(18, 36, &mut rng).unwrap();
    RaceBoard::with_random_starts(grid, 3, &mut rng).unwrap()
}

/// Single locked step, the hot path of every agent tick.
pub fn step_benchmark(c: &mut Criterion) {
    let board = board();
    let id = AgentId::new(0);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    c.bench_function("board_step", |b| {
        b.iter(|| {
            let delta = race_core::policy::uniform_step(&mut rng);
            black_box(board.lock().step(id, delta))
        })
    });
}

pub fn snapshot_benchmark(c: &mut Criterion) {
    let board = board();
    c.bench_function("board_snapshot", |b| {
        b.iter(|| black_box(board.lock().snapshot_at(Instant::now())))
    });
}

/// A full three-agent race with no pacing.
pub fn race_benchmark(c: &mut Criterion) {
    let config = RaceConfig {
        tick_delay_ms: 0,
        ..RaceConfig::default()
    };
    c.bench_function("race_unpaced", |b| {
        b.iter(|| {
            let race = Race::new(config.clone()).unwrap();
            black_box(race.run(EventSink::disabled(), CancelToken::new()))
        })
    });
}

criterion_group!(benches, step_benchmark, snapshot_benchmark, race_benchmark);
criterion_main!(benches);
