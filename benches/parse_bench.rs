//! Benchmark: parsing and resolution
//!
//! Run: cargo bench --bench parse_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ginconf::{apply, evaluate, maze, parse};

const MAZE_FSM: &str = include_str!("../configs/maze_fsm.gin");

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    group.bench_function("int", |b| {
        b.iter(|| black_box(evaluate(black_box("500000")).unwrap()));
    });

    group.bench_function("float", |b| {
        b.iter(|| black_box(evaluate(black_box("0.001")).unwrap()));
    });

    group.bench_function("reference", |b| {
        b.iter(|| {
            black_box(
                evaluate(black_box("@learning_rate_schedules.ConstantLearningRateSchedule()"))
                    .unwrap(),
            )
        });
    });

    group.bench_function("nested_list", |b| {
        b.iter(|| black_box(evaluate(black_box("[[1, 2], (3.5, \"a\"), None]")).unwrap()));
    });

    group.finish();
}

fn bench_example_file(c: &mut Criterion) {
    let registry = maze::registry().unwrap();
    let statements = parse(MAZE_FSM, "maze_fsm.gin").unwrap();

    c.bench_function("parse_example_file", |b| {
        b.iter(|| black_box(parse(black_box(MAZE_FSM), "maze_fsm.gin").unwrap()));
    });

    c.bench_function("apply_example_file", |b| {
        b.iter(|| black_box(apply(black_box(&statements), &registry).unwrap()));
    });
}

criterion_group!(benches, bench_evaluate, bench_example_file);
criterion_main!(benches);
