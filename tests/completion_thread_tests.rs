mod common;

use common::{Harness, ids};
use iap_observer::domain::transaction::TransactionRecord;

#[tokio::test]
async fn test_completion_from_spawned_tasks() {
    let harness = Harness::new();

    harness.observer.on_queue_update(&[
        TransactionRecord::purchased("t-1", "a"),
        TransactionRecord::purchased("t-2", "b"),
    ]);
    let tokens = harness.delegate.take_tokens();
    assert!(harness.acknowledged().is_empty());

    // Each token is completed twice from separate tasks
    let handles: Vec<_> = tokens
        .iter()
        .flat_map(|token| [token.clone(), token.clone()])
        .map(|token| tokio::spawn(async move { token.complete() }))
        .collect();

    let mut acknowledged = 0;
    for handle in handles {
        if handle.await.unwrap() {
            acknowledged += 1;
        }
    }

    assert_eq!(acknowledged, 2);
    let mut finished = harness.acknowledged();
    finished.sort();
    assert_eq!(finished, ids(&["t-1", "t-2"]));
}

#[test]
fn test_completion_from_os_thread() {
    let harness = Harness::new();

    harness
        .observer
        .on_queue_update(&[TransactionRecord::purchased("t-1", "a")]);
    let token = harness.delegate.take_tokens().remove(0);

    std::thread::spawn(move || {
        assert!(token.complete());
    })
    .join()
    .unwrap();

    assert_eq!(harness.acknowledged(), ids(&["t-1"]));
}

#[test]
fn test_observer_outlives_dropped_delegate() {
    let harness = Harness::new();
    let common::Harness {
        observer, delegate, ..
    } = harness;
    drop(delegate);

    let outcome = observer.on_queue_update(&[TransactionRecord::purchased("t-1", "a")]);

    assert_eq!(outcome.unclaimed, 1);
    assert_eq!(outcome.awaiting_completion, 0);
}
