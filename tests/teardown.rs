//! Close behavior: ordering, failures, and re-entry.

use std::sync::{Arc, Mutex};

use boot_lifecycle::lifecycle::{HookError, LifecycleError, LifecycleEvent, LifecycleState};

mod common;

use common::{EventCollector, Recorder};

fn register(lifecycle: &boot_lifecycle::Lifecycle, log: &Recorder, label: &'static str) {
    let log = log.clone();
    lifecycle
        .register_before_close(label, move || async move {
            log.push(label);
            Ok::<(), HookError>(())
        })
        .unwrap();
}

#[tokio::test]
async fn test_close_runs_callbacks_newest_first() {
    let lifecycle = common::lifecycle(10_000);
    let log = Recorder::new();
    let app_events = EventCollector::attach(lifecycle.app().events());

    for label in ["A", "B", "C"] {
        register(&lifecycle, &log, label);
    }
    assert_eq!(lifecycle.teardown_len(), 3);

    lifecycle.close().await.unwrap();
    assert_eq!(log.entries(), vec!["C", "B", "A"]);
    assert_eq!(lifecycle.teardown_len(), 0);
    assert_eq!(lifecycle.state(), LifecycleState::Closed);
    assert_eq!(app_events.names(), vec!["close"]);

    // Second close is a no-op.
    lifecycle.close().await.unwrap();
    assert_eq!(log.entries().len(), 3);
    assert_eq!(app_events.events().len(), 1);
}

#[tokio::test]
async fn test_close_releases_listeners() {
    let lifecycle = common::lifecycle(10_000);
    lifecycle.events().on(|_| {});
    lifecycle.app().events().on(|_| {});

    lifecycle.close().await.unwrap();
    assert_eq!(lifecycle.events().listener_count(), 0);
    assert_eq!(lifecycle.app().events().listener_count(), 0);
}

#[tokio::test]
async fn test_failing_callback_does_not_stop_close() {
    let lifecycle = common::lifecycle(10_000);
    let log = Recorder::new();

    register(&lifecycle, &log, "A");
    lifecycle
        .register_before_close("B", || async { Err::<(), HookError>("socket stuck".into()) })
        .unwrap();
    register(&lifecycle, &log, "C");

    let err = lifecycle.close().await.unwrap_err();
    match err {
        LifecycleError::Teardown(failures) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].to_string().contains("socket stuck"));
        }
        other => panic!("expected teardown error, got {:?}", other),
    }
    assert_eq!(log.entries(), vec!["C", "A"]);
    assert_eq!(lifecycle.teardown_len(), 0);
}

#[tokio::test]
async fn test_register_during_close_is_rejected() {
    let lifecycle = common::lifecycle(10_000);
    let attempt: Arc<Mutex<Option<Result<(), LifecycleError>>>> = Arc::new(Mutex::new(None));

    let handle = lifecycle.clone();
    let sink = attempt.clone();
    lifecycle
        .register_before_close("re-entrant", move || async move {
            let result =
                handle.register_before_close("nested", || async { Ok::<(), HookError>(()) });
            *sink.lock().unwrap() = Some(result);
            Ok::<(), HookError>(())
        })
        .unwrap();

    lifecycle.close().await.unwrap();

    let result = attempt.lock().unwrap().take().unwrap();
    assert!(matches!(
        result,
        Err(LifecycleError::InvalidState {
            state: LifecycleState::Closing,
            ..
        })
    ));

    let err = lifecycle
        .register_before_close("after", || async { Ok::<(), HookError>(()) })
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_state");
}

#[tokio::test]
async fn test_close_event_follows_teardown() {
    let lifecycle = common::lifecycle(10_000);
    let order = Recorder::new();

    let seen = order.clone();
    lifecycle.app().events().on(move |event| {
        if let LifecycleEvent::Close = event {
            seen.push("close");
        }
    });
    register(&lifecycle, &order, "server");

    lifecycle.close().await.unwrap();
    assert_eq!(order.entries(), vec!["server", "close"]);
}
