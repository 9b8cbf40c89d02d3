//! Testing utilities for the confbench workspace
//!
//! Shared fixtures and assertions.

#![allow(missing_docs)]

use confbench_core::{BenchmarkConfig, WorkItem};
use confbench_store::{RecordId, Store};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Value of the single record most scenarios run against
pub const SAMPLE_VALUE: f64 = 0.37;

/// Store holding one record with [`SAMPLE_VALUE`]
pub fn store_with_sample() -> (Store, RecordId) {
    let store = Store::new();
    let record = store.insert(SAMPLE_VALUE).unwrap();
    (store, record)
}

/// Store plus a work item fetched from it
pub fn store_with_item() -> (Store, RecordId, WorkItem) {
    let (store, record) = store_with_sample();
    let item = WorkItem::fetch(&store, record).unwrap();
    (store, record, item)
}

/// Store holding `count` records with reproducible values in `[0, 1)`
pub fn seeded_store(count: usize, seed: u64) -> Store {
    let store = Store::new();
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..count {
        store.insert(rng.random_range(0.0..1.0)).unwrap();
    }
    store
}

/// Small run: `outer` units of 1000 terms on two workers
pub fn small_config(outer: u64) -> BenchmarkConfig {
    BenchmarkConfig::new()
        .with_outer_iterations(outer)
        .with_inner_iterations(1_000)
        .with_workers(2)
}

/// Assert two floats agree within `tolerance`
#[track_caller]
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} +/- {tolerance}, got {actual}"
    );
}
