use criterion::{criterion_group, criterion_main, Criterion};
use grid_astar::{CellKind, NoProgress, SearchEngine, SearchGrid};
use grid_util::point::Point;
use rand::prelude::*;
use std::hint::black_box;

fn empty_grid_bench(c: &mut Criterion) {
    let base = SearchGrid::build(50, 800).unwrap();
    let engine = SearchEngine::new();
    let start = Point::new(0, 0);
    let end = Point::new(49, 49);
    c.bench_function("empty 50x50", |b| {
        b.iter(|| {
            let mut grid = base.clone();
            grid.refresh_neighbours();
            black_box(engine.run(&mut grid, start, end, &mut NoProgress).unwrap());
        })
    });
}

fn random_barriers_bench(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut base = SearchGrid::build(50, 800).unwrap();
    for row in 0..50 {
        for col in 0..50 {
            if rng.gen_bool(0.3) {
                base.set_kind(row, col, CellKind::Barrier).unwrap();
            }
        }
    }
    base.set_kind(0, 0, CellKind::Empty).unwrap();
    base.set_kind(49, 49, CellKind::Empty).unwrap();
    let engine = SearchEngine::new();
    let start = Point::new(0, 0);
    let end = Point::new(49, 49);
    c.bench_function("30% barriers 50x50", |b| {
        b.iter(|| {
            let mut grid = base.clone();
            grid.refresh_neighbours();
            black_box(engine.run(&mut grid, start, end, &mut NoProgress).unwrap());
        })
    });
}

criterion_group!(benches, empty_grid_bench, random_barriers_bench);
criterion_main!(benches);
