// tests/runtime_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use gantry::engine::{
    RetriggerPolicy, Runtime, RuntimeEvent, RuntimeOptions, TriggerQueue, TriggerReason,
};
use gantry::graph::{RunReport, Session, TaskState};
use gantry_test_utils::builders::{graph_of, task};
use gantry_test_utils::fake_executor::FakeExecutor;
use gantry_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn pipeline_session() -> Session {
    Session::new(graph_of(vec![
        task("clean", "rm -rf dist", &[]),
        task("build", "make", &["clean"]),
        task("serve", "serve dist", &["build"]),
    ]))
}

async fn trigger(tx: &mpsc::Sender<RuntimeEvent>, name: &str) -> TestResult {
    tx.send(RuntimeEvent::TaskTriggered {
        task: name.to_string(),
        reason: TriggerReason::Manual,
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn chain_executes_in_order_and_reports_success() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    trigger(&rt_tx, "serve").await?;

    let session = pipeline_session();
    let queue = TriggerQueue::new(RetriggerPolicy::Queue, 1);
    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let runtime = Runtime::new(session, queue, options, rt_rx, executor);

    let report = timeout(Duration::from_secs(3), runtime.run())
        .await
        .expect("runtime did not finish within 3 seconds")?
        .expect("a run should have finished");

    let order = executed.lock().unwrap().clone();
    assert_eq!(order, vec!["clean", "build", "serve"]);
    assert!(report.success());

    Ok(())
}

#[tokio::test]
async fn failing_dependency_skips_dependents_in_report() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor =
        FakeExecutor::new(rt_tx.clone(), executed.clone()).with_failing(["clean"]);

    trigger(&rt_tx, "serve").await?;

    let session = pipeline_session();
    let queue = TriggerQueue::new(RetriggerPolicy::Queue, 1);
    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let runtime = Runtime::new(session, queue, options, rt_rx, executor);

    let report = timeout(Duration::from_secs(3), runtime.run())
        .await
        .expect("runtime did not finish within 3 seconds")?
        .expect("a run should have finished");

    // Only the failing root actually executed.
    assert_eq!(executed.lock().unwrap().clone(), vec!["clean"]);
    assert!(!report.success());
    assert_eq!(report.state_of("clean"), Some(TaskState::Failed));
    assert_eq!(report.state_of("build"), Some(TaskState::Skipped));
    assert_eq!(report.state_of("serve"), Some(TaskState::Skipped));
    assert_eq!(report.first_failure, Some(("clean".to_string(), 1)));

    Ok(())
}

#[tokio::test]
async fn trigger_during_run_is_queued_into_next_session() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let (report_tx, mut report_rx) = mpsc::channel::<RunReport>(8);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    // Both triggers are in the channel before the runtime starts: the
    // second arrives while the first session is mid-flight and must be
    // queued, not lost.
    trigger(&rt_tx, "build").await?;
    trigger(&rt_tx, "serve").await?;

    let session = pipeline_session();
    let queue = TriggerQueue::new(RetriggerPolicy::Queue, 1);
    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let runtime =
        Runtime::new(session, queue, options, rt_rx, executor).with_reports(report_tx);

    let last = timeout(Duration::from_secs(3), runtime.run())
        .await
        .expect("runtime did not finish within 3 seconds")?
        .expect("a run should have finished");

    // First session: build's closure. Second session: serve, with clean
    // and build satisfied by history.
    let order = executed.lock().unwrap().clone();
    assert_eq!(order, vec!["clean", "build", "serve"]);

    let first = report_rx.recv().await.expect("first report");
    assert!(first.success());
    assert_eq!(first.state_of("serve"), None);

    let second = report_rx.recv().await.expect("second report");
    assert!(second.success());
    assert_eq!(second.state_of("serve"), Some(TaskState::Succeeded));
    assert_eq!(second.run_id, last.run_id);

    Ok(())
}

#[tokio::test]
async fn shutdown_event_stops_the_loop() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let session = pipeline_session();
    let queue = TriggerQueue::new(RetriggerPolicy::Queue, 1);
    let runtime = Runtime::new(session, queue, RuntimeOptions::default(), rt_rx, executor);

    let report = timeout(Duration::from_secs(3), runtime.run())
        .await
        .expect("runtime did not finish within 3 seconds")?;

    assert!(report.is_none());
    assert!(executed.lock().unwrap().is_empty());

    Ok(())
}
