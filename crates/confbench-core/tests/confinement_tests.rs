//! Failure paths of the confined strategies

use confbench_core::prelude::*;
use confbench_core::RunState;
use confbench_test_utils::{small_config, store_with_item};

#[test]
fn dropped_store_fails_both_confined_strategies() {
    let (store, _record, item) = store_with_item();
    drop(store);
    let harness = Harness::new(small_config(8)).unwrap();

    for strategy in [Strategy::SerialConfined, Strategy::ParallelConfined] {
        let err = harness.run(strategy, &item).unwrap_err();
        assert!(err.is_confinement_violation(), "{strategy}: {err}");
        assert_eq!(harness.board().get(strategy), None);
        assert_eq!(harness.board().state(strategy), RunState::Failed);
    }

    // plain strategies only need the captured value
    let result = harness.run(Strategy::ParallelPlain, &item).unwrap();
    assert!(result.value.is_some());
}

#[test]
fn closed_store_fails_without_publishing() {
    let (store, _record, item) = store_with_item();
    let harness = Harness::new(small_config(8)).unwrap();

    let before = harness.run(Strategy::ParallelConfined, &item).unwrap();
    store.close();
    let err = harness.run(Strategy::ParallelConfined, &item).unwrap_err();

    assert!(err.is_confinement_violation());
    assert_eq!(harness.board().get(Strategy::ParallelConfined), Some(before));
}

#[test]
fn removed_record_fails_confined_run() {
    let (store, record, item) = store_with_item();
    store.remove(record).unwrap();
    let harness = Harness::new(small_config(4)).unwrap();

    let err = harness.run(Strategy::SerialConfined, &item).unwrap_err();
    assert!(err.is_confinement_violation());
    assert!(err.to_string().contains(&store.object_id(record).to_string()));
}

#[test]
fn cancelled_run_publishes_nothing() {
    let (_store, _record, item) = store_with_item();
    let harness = Harness::new(small_config(8)).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = harness
        .run_with_cancel(Strategy::ParallelConfined, &item, &cancel)
        .unwrap_err();

    assert!(matches!(
        err,
        BenchError::Cancelled { completed: 0, total: 8, .. }
    ));
    assert_eq!(harness.board().get(Strategy::ParallelConfined), None);
    assert_eq!(
        harness.board().state(Strategy::ParallelConfined),
        RunState::Cancelled
    );
}

#[test]
fn cancellation_mid_run_reports_progress() {
    let (_store, _record, item) = store_with_item();
    let config = small_config(1_000_000).with_inner_iterations(10_000);
    let harness = std::sync::Arc::new(Harness::new(config).unwrap());
    let cancel = CancelToken::new();

    let worker = {
        let harness = std::sync::Arc::clone(&harness);
        let cancel = cancel.clone();
        std::thread::spawn(move || harness.run_with_cancel(Strategy::SerialPlain, &item, &cancel))
    };
    std::thread::sleep(std::time::Duration::from_millis(20));
    cancel.cancel();

    match worker.join().unwrap() {
        Err(BenchError::Cancelled { completed, total, .. }) => {
            assert_eq!(total, 1_000_000);
            assert!(completed < total);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[test]
fn parallel_cancellation_mid_run_publishes_nothing() {
    let (store, record, item) = store_with_item();
    let config = small_config(1_000_000).with_inner_iterations(10_000);
    let harness = std::sync::Arc::new(Harness::new(config).unwrap());
    let cancel = CancelToken::new();

    let worker = {
        let harness = std::sync::Arc::clone(&harness);
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            harness.run_with_cancel(Strategy::ParallelConfined, &item, &cancel)
        })
    };
    std::thread::sleep(std::time::Duration::from_millis(20));
    cancel.cancel();

    match worker.join().unwrap() {
        Err(BenchError::Cancelled {
            strategy,
            completed,
            total,
        }) => {
            assert_eq!(strategy, Strategy::ParallelConfined);
            assert_eq!(total, 1_000_000);
            assert!(completed < total);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(harness.board().get(Strategy::ParallelConfined), None);
    assert_eq!(
        harness.board().state(Strategy::ParallelConfined),
        RunState::Cancelled
    );
    assert_eq!(store.value(record).unwrap(), confbench_test_utils::SAMPLE_VALUE);
}
