//! End-to-end tests of push dispatch through the transport event bus
//! These tests double as examples of wiring a presenter into the runtime

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{counted_completion, Behavior, RecordingPresenter};
use rvoip_push_core::{
    Completion, DispatchOutcome, HandleType, MemoryTokenStore, PresenterSlot, PushConfig, PushRuntime,
    RawPushPayload, TransportEvent,
};

fn runtime_with(presenter: Arc<RecordingPresenter>) -> PushRuntime {
    PushRuntime::new(
        &PushConfig::default(),
        PresenterSlot::with_presenter(presenter),
        Arc::new(MemoryTokenStore::new()),
    )
}

#[tokio::test]
async fn test_cancel_push_ends_all_calls() {
    let presenter = RecordingPresenter::ok();
    let runtime = runtime_with(presenter.clone());
    let (completion, acks) = counted_completion();

    let payload = RawPushPayload::from_value(json!({ "type": "cancel_call", "nameCaller": "Alice" }));
    let outcome = runtime.handle_push(payload, completion).await;

    assert_eq!(outcome, DispatchOutcome::CallsEnded);
    assert_eq!(presenter.ended_count(), 1);
    assert_eq!(presenter.shown_count(), 0);
    assert_eq!(acks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_incoming_push_shows_call_from_push() {
    let presenter = RecordingPresenter::ok();
    let runtime = runtime_with(presenter.clone());
    let (completion, acks) = counted_completion();

    let payload = RawPushPayload::from_value(json!({
        "id": "x1",
        "nameCaller": "Bob",
        "handle": "+1234",
        "ios": { "handleType": "number" },
    }));
    let outcome = runtime.handle_push(payload, completion).await;

    assert_eq!(outcome, DispatchOutcome::CallPresented { call_id: "x1".to_string() });
    assert_eq!(acks.load(Ordering::SeqCst), 1);

    let shown = presenter.shown.lock();
    let (call, from_push) = &shown[0];
    assert!(*from_push);
    assert_eq!(call.id(), "x1");
    assert_eq!(call.name_caller(), "Bob");
    assert_eq!(call.handle(), "+1234");
    assert_eq!(call.text_decline(), "Decline");
    assert_eq!(call.platform_options().handle_type, HandleType::Number);
}

#[tokio::test]
async fn test_presenter_failure_still_acknowledges() {
    let presenter = RecordingPresenter::new(Behavior::Fail);
    let runtime = runtime_with(presenter.clone());

    for payload in [json!({ "type": "cancel_call" }), json!({ "nameCaller": "Eve" })] {
        let (completion, acks) = counted_completion();
        let outcome = runtime.handle_push(RawPushPayload::from_value(payload), completion).await;
        assert!(matches!(outcome, DispatchOutcome::PresenterFailed { .. }));
        assert_eq!(acks.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_presenter_panic_still_acknowledges() {
    let presenter = RecordingPresenter::new(Behavior::Panic);
    let runtime = Arc::new(runtime_with(presenter));
    let (completion, acks) = counted_completion();

    let task_runtime = runtime.clone();
    let joined = tokio::spawn(async move {
        task_runtime
            .handle_push(RawPushPayload::new().with("nameCaller", "Mallory"), completion)
            .await
    })
    .await;

    assert!(joined.unwrap_err().is_panic());
    assert_eq!(acks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stalled_presenter_still_acknowledges() {
    let presenter = RecordingPresenter::new(Behavior::Hang);
    let config = PushConfig::new().with_presenter_timeout(Duration::from_millis(50));
    let runtime = PushRuntime::new(
        &config,
        PresenterSlot::with_presenter(presenter.clone()),
        Arc::new(MemoryTokenStore::new()),
    );

    for payload in [json!({ "nameCaller": "Trent" }), json!({ "type": "cancel_call" })] {
        let (completion, acked) = Completion::channel();
        runtime
            .bus()
            .dispatch(TransportEvent::incoming_push(RawPushPayload::from_value(payload), completion))
            .await;

        let acked = tokio::time::timeout(Duration::from_secs(5), acked).await;
        assert!(matches!(acked, Ok(Ok(()))), "push was not acknowledged");
    }

    let (completion, acks) = counted_completion();
    let outcome = runtime.handle_push(RawPushPayload::new(), completion).await;
    match outcome {
        DispatchOutcome::PresenterFailed { reason } => assert!(reason.contains("did not finish")),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(acks.load(Ordering::SeqCst), 1);
    assert_eq!(presenter.shown_count(), 2);
    assert_eq!(presenter.ended_count(), 1);
}

#[tokio::test]
async fn test_presenter_installed_later() {
    let runtime = PushRuntime::from_config(&PushConfig::default()).unwrap();

    let (completion, acks) = counted_completion();
    let outcome = runtime.handle_push(RawPushPayload::new(), completion).await;
    assert_eq!(outcome, DispatchOutcome::PresenterUnavailable);
    assert_eq!(acks.load(Ordering::SeqCst), 1);

    let presenter = RecordingPresenter::ok();
    runtime.presenter().install(presenter.clone()).await;

    let (completion, acks) = counted_completion();
    let outcome = runtime.handle_push(RawPushPayload::new(), completion).await;
    assert!(matches!(outcome, DispatchOutcome::CallPresented { .. }));
    assert_eq!(presenter.shown_count(), 1);
    assert_eq!(acks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bus_routes_each_kind() {
    let presenter = RecordingPresenter::ok();
    let runtime = runtime_with(presenter.clone());
    let bus = runtime.bus();

    let (completion, acked) = Completion::channel();
    assert!(bus.dispatch(TransportEvent::incoming_push(RawPushPayload::new(), completion)).await);
    assert!(acked.await.is_ok());

    assert!(bus.dispatch(TransportEvent::CredentialsUpdated { credentials: vec![0xab, 0xcd] }).await);
    assert!(bus.dispatch(TransportEvent::TokenInvalidated).await);

    let (event, reply) = TransportEvent::foreground(RawPushPayload::new().with("aps", json!({})));
    assert!(bus.dispatch(event).await);
    assert!(reply.await.unwrap().alert);

    assert_eq!(presenter.shown_count(), 1);
    assert_eq!(*presenter.tokens.lock(), vec!["abcd".to_string(), String::new()]);
}

#[tokio::test]
async fn test_custom_call_defaults_from_config() {
    let config = PushConfig::from_toml_str(
        r#"
        [call_defaults]
        name_caller = "Inconnu"
        text_accept = "Répondre"
        "#,
    )
    .unwrap();
    let presenter = RecordingPresenter::ok();
    let runtime = PushRuntime::new(
        &config,
        PresenterSlot::with_presenter(presenter.clone()),
        Arc::new(MemoryTokenStore::new()),
    );

    runtime.handle_push(RawPushPayload::new(), Completion::noop()).await;

    let shown = presenter.shown.lock();
    assert_eq!(shown[0].0.name_caller(), "Inconnu");
    assert_eq!(shown[0].0.text_accept(), "Répondre");
    assert_eq!(shown[0].0.handle(), "Caller");
}
