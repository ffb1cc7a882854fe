//! End-to-end behaviour of `System::run_with_args`.

mod common;

use common::{args, test_config, FailingTrigger, RecordingDispatcher, StaticEdge, WaitingTrigger};
use glu::config::MetricsConfig;
use glu::{GluError, Metadata, Pipeline, RunState, System};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

#[tokio::test]
async fn test_one_shot_returns_dispatcher_result_verbatim() {
    let dispatcher = RecordingDispatcher::failing("unknown pipeline phase");
    let mut system = System::new(Metadata::new("one-shot"))
        .with_config(test_config())
        .with_dispatcher(dispatcher.clone());
    system.add_pipeline(Pipeline::new(Metadata::new("p")).with_edge(Arc::new(StaticEdge {
        kind: "promotion",
    })));

    let err = system
        .run_with_args(args(&["glu", "inspect", "p"]))
        .await
        .unwrap_err();

    assert!(matches!(err, GluError::Command(ref m) if m == "unknown pipeline phase"));
    assert_eq!(dispatcher.calls(), vec![args(&["glu", "inspect", "p"])]);
    assert_eq!(system.run_state(), RunState::OneShot);
}

#[tokio::test]
async fn test_one_shot_success_does_not_start_service() {
    let dispatcher = RecordingDispatcher::default();
    let waiting = Arc::new(WaitingTrigger::default());
    let mut system = System::new(Metadata::new("one-shot")).with_dispatcher(dispatcher.clone());
    system.add_pipeline(Pipeline::new(Metadata::new("p")).with_triggerable_edge(waiting.clone()));

    tokio::time::timeout(
        Duration::from_secs(1),
        system.run_with_args(args(&["glu", "config"])),
    )
    .await
    .expect("one-shot commands return without waiting for cancellation")
    .unwrap();

    assert_eq!(dispatcher.calls().len(), 1);
    assert_eq!(waiting.stopped(), 0);
}

#[tokio::test]
async fn test_stored_startup_error_short_circuits_run() {
    let dispatcher = RecordingDispatcher::default();
    let mut system = System::new(Metadata::new("broken"))
        .with_config(test_config())
        .with_dispatcher(dispatcher.clone());
    system.add_pipeline_with(|_| Err(GluError::Command("missing source repository".to_string())));

    let err = system
        .run_with_args(args(&["glu", "inspect"]))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Command error: missing source repository");
    assert!(dispatcher.calls().is_empty());
    assert_eq!(system.run_state(), RunState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_trigger_failure_stops_the_service() {
    let waiting = Arc::new(WaitingTrigger::default());
    let mut system = System::new(Metadata::new("service")).with_config(test_config());
    system.add_pipeline(
        Pipeline::new(Metadata::new("p"))
            .with_triggerable_edge(waiting.clone())
            .with_triggerable_edge(Arc::new(FailingTrigger {
                after: Duration::from_millis(50),
                message: "source repository unreachable",
            })),
    );

    let result = tokio::time::timeout(Duration::from_secs(10), system.run_with_args(args(&["glu"])))
        .await
        .expect("service should stop after a trigger fails");

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        GluError::Trigger { ref message, .. } if message == "source repository unreachable"
    ));
    assert_eq!(waiting.stopped(), 1);
    assert_eq!(system.run_state(), RunState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_root_cancellation_is_a_clean_stop() {
    let waiting = Arc::new(WaitingTrigger::default());
    let root = tokio_util::sync::CancellationToken::new();
    let mut system =
        System::with_context(root.clone(), Metadata::new("service")).with_config(test_config());
    system.add_pipeline(Pipeline::new(Metadata::new("p")).with_triggerable_edge(waiting.clone()));

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        root.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(10), system.run_with_args(args(&["glu"])))
        .await
        .expect("service should stop once the root token is cancelled");
    assert_ok!(result);

    stopper.await.unwrap();
    assert_eq!(waiting.stopped(), 1);
    assert_eq!(system.run_state(), RunState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_prometheus_service_shuts_down_cleanly() {
    let root = tokio_util::sync::CancellationToken::new();
    let mut config = test_config();
    config.metrics = MetricsConfig::default();
    let mut system =
        System::with_context(root.clone(), Metadata::new("metrics")).with_config(config);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        root.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(10), system.run_with_args(args(&["glu"])))
        .await
        .expect("service should stop");
    assert_ok!(result);
    assert_eq!(system.run_state(), RunState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bind_failure_is_returned() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = test_config();
    config.server.port = occupied.local_addr().unwrap().port();

    let waiting = Arc::new(WaitingTrigger::default());
    let mut system = System::new(Metadata::new("service")).with_config(config);
    system.add_pipeline(Pipeline::new(Metadata::new("p")).with_triggerable_edge(waiting.clone()));

    let err = tokio::time::timeout(Duration::from_secs(10), system.run_with_args(args(&["glu"])))
        .await
        .expect("bind failure should stop the service")
        .unwrap_err();

    assert!(matches!(err, GluError::Server(ref m) if m.starts_with("binding 127.0.0.1:")));
    assert_eq!(waiting.stopped(), 1);
}
