//! Strategy benchmarks.
//!
//! Compares the four strategies on the same work item, plus the bare cost
//! of deriving a confined handle.

#![allow(missing_docs)]

use confbench_core::{
    leibniz_pi, with_confined, BenchmarkConfig, CancelToken, Dispatcher, Strategy, WorkItem,
};
use confbench_test_utils::store_with_item;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_strategies(c: &mut Criterion) {
    let (_store, _record, item) = store_with_item();
    let config = BenchmarkConfig::new()
        .with_outer_iterations(32)
        .with_inner_iterations(10_000);
    let dispatcher = Dispatcher::new(&config).expect("build dispatcher");
    let cancel = CancelToken::new();

    let mut group = c.benchmark_group("strategies");
    for strategy in Strategy::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &item, |b, item| {
            b.iter(|| {
                black_box(
                    dispatcher
                        .dispatch(strategy, item, &config, &cancel)
                        .expect("run strategy"),
                )
            });
        });
    }
    group.finish();
}

fn bench_confinement_overhead(c: &mut Criterion) {
    let (_store, _record, item) = store_with_item();
    let plain = item.plain_handle();
    let confined = item.confined_handle().expect("confined handle");

    let mut group = c.benchmark_group("confinement_overhead");
    group.bench_function("plain_unit", |b| {
        b.iter(|| black_box(with_confined(&plain, |acc| leibniz_pi(acc, 100)).expect("plain")));
    });
    group.bench_function("confined_unit", |b| {
        b.iter(|| {
            black_box(with_confined(&confined, |acc| leibniz_pi(acc, 100)).expect("confined"))
        });
    });
    group.finish();
}

fn bench_synthetic_item(c: &mut Criterion) {
    let config = BenchmarkConfig::new()
        .with_outer_iterations(1)
        .with_inner_iterations(500_000);
    let dispatcher = Dispatcher::new(&config).expect("build dispatcher");
    let item = WorkItem::synthetic(0.37);

    c.bench_function("single_unit_default_terms", |b| {
        b.iter(|| {
            black_box(
                dispatcher
                    .run_serial_plain(&item, &config, &CancelToken::new())
                    .expect("run"),
            )
        });
    });
}

criterion_group!(
    benches,
    bench_strategies,
    bench_confinement_overhead,
    bench_synthetic_item
);
criterion_main!(benches);
