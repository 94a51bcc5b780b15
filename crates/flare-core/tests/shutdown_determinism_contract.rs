//! Contract Test: Shutdown Determinism
//!
//! Constraints verified:
//! - The loop terminates promptly on the shutdown signal
//! - Dropping the shutdown sender also stops the loop
//! - The loop keeps ticking on its interval until told to stop
//!
//! If this test fails, someone has added a tick that ignores cancellation
//! or a blocking call in the shutdown path.

mod common;

use common::*;
use flare_core::{ReconcileEvent, RecordState};
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep, timeout};

#[tokio::test]
async fn shutdown_signal_terminates_loop() {
    let resolver = ScriptedIpResolver::fixed(ip(1, 2, 3, 4));
    let provider = MockDnsProvider::empty();
    let (mut reconciler, mut event_rx) = build_reconciler(&resolver, &provider);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let result = reconciler.run(shutdown_rx).await;
        (reconciler, result)
    });

    sleep(Duration::from_millis(50)).await;
    assert!(shutdown_tx.send(()).is_ok(), "shutdown signal send succeeds");

    let (reconciler, result) = timeout(Duration::from_secs(5), handle)
        .await
        .expect("Reconciler should terminate within 5 seconds")
        .expect("Reconciler task should not panic");

    assert!(result.is_ok(), "Clean shutdown returns Ok, got {:?}", result);
    assert_eq!(
        reconciler.state(),
        RecordState::Present {
            content: "1.2.3.4".to_string(),
            proxied: false,
        }
    );

    let events = drain_events(&mut event_rx);
    assert_eq!(
        events.first(),
        Some(&ReconcileEvent::Started {
            record_name: "home.example.com".to_string(),
        })
    );
    assert!(
        matches!(events.last(), Some(ReconcileEvent::Stopped { .. })),
        "Last event should be Stopped, got {:?}",
        events
    );
}

#[tokio::test]
async fn dropped_sender_stops_loop() {
    let resolver = ScriptedIpResolver::fixed(ip(1, 2, 3, 4));
    let provider = MockDnsProvider::empty();
    let (mut reconciler, _event_rx) = build_reconciler(&resolver, &provider);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move { reconciler.run(shutdown_rx).await });

    sleep(Duration::from_millis(30)).await;
    drop(shutdown_tx);

    let result = timeout(Duration::from_secs(5), handle)
        .await
        .expect("Reconciler should terminate when the sender is dropped")
        .expect("Reconciler task should not panic");
    assert!(result.is_ok());
}

#[tokio::test]
async fn loop_reconciles_on_interval_until_shutdown() {
    // Startup sees .1, the first tick sees it again, later ticks see .2
    let resolver = ScriptedIpResolver::new(vec![
        Some(ip(192, 0, 2, 1)),
        Some(ip(192, 0, 2, 1)),
        Some(ip(192, 0, 2, 2)),
    ]);
    let provider = MockDnsProvider::empty();
    let (mut reconciler, _event_rx) = build_reconciler(&resolver, &provider);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move { reconciler.run(shutdown_rx).await });

    // The test interval is 20ms; give the loop several ticks
    sleep(Duration::from_millis(200)).await;
    let _ = shutdown_tx.send(());

    timeout(Duration::from_secs(5), handle)
        .await
        .expect("Reconciler should terminate within 5 seconds")
        .expect("Reconciler task should not panic")
        .expect("Clean shutdown");

    assert!(resolver.call_count() >= 3, "Loop should keep resolving");
    assert_eq!(provider.creates().len(), 1);

    let updates = provider.updates();
    assert_eq!(updates.len(), 1, "Only the change to .2 is written");
    assert_eq!(updates[0].id, CREATED_ID);
    assert_eq!(updates[0].content, "192.0.2.2");
}
