// tests/watcher_lifecycle.rs

use std::error::Error;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use gantry::engine::{RuntimeEvent, TriggerReason};
use gantry::watch::{spawn_watcher, WatchRule};
use gantry_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

async fn expect_trigger(
    rx: &mut mpsc::Receiver<RuntimeEvent>,
    task: &str,
) -> Option<RuntimeEvent> {
    loop {
        match timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Some(event)) => {
                if let RuntimeEvent::TaskTriggered {
                    task: triggered, ..
                } = &event
                {
                    if triggered == task {
                        return Some(event);
                    }
                }
            }
            _ => return None,
        }
    }
}

#[tokio::test]
async fn file_change_triggers_matching_task() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let rules = vec![WatchRule::compile("css", &["*.scss".to_string()], &[])?];
    let (rt_tx, mut rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let _watcher = spawn_watcher(dir.path(), rules, rt_tx, Duration::ZERO)?;
    // Give the OS watcher a moment to register before producing events.
    sleep(Duration::from_millis(200)).await;

    std::fs::write(dir.path().join("site.scss"), "body {}")?;

    let event = expect_trigger(&mut rt_rx, "css").await.expect("trigger");
    assert!(matches!(
        event,
        RuntimeEvent::TaskTriggered {
            reason: TriggerReason::FileWatch,
            ..
        }
    ));

    Ok(())
}

#[tokio::test]
async fn non_matching_change_triggers_nothing() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let rules = vec![WatchRule::compile("css", &["*.scss".to_string()], &[])?];
    let (rt_tx, mut rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let _watcher = spawn_watcher(dir.path(), rules, rt_tx, Duration::ZERO)?;
    sleep(Duration::from_millis(200)).await;

    std::fs::write(dir.path().join("notes.txt"), "hello")?;

    assert!(expect_trigger(&mut rt_rx, "css").await.is_none());

    Ok(())
}

#[tokio::test]
async fn dropping_the_handle_unsubscribes_all_patterns() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let rules = vec![WatchRule::compile("css", &["*.scss".to_string()], &[])?];
    let (rt_tx, mut rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let watcher = spawn_watcher(dir.path(), rules, rt_tx, Duration::ZERO)?;
    sleep(Duration::from_millis(200)).await;

    std::fs::write(dir.path().join("first.scss"), "body {}")?;
    assert!(expect_trigger(&mut rt_rx, "css").await.is_some());

    drop(watcher);
    // Let any in-flight events drain before testing silence.
    sleep(Duration::from_millis(300)).await;
    while rt_rx.try_recv().is_ok() {}

    std::fs::write(dir.path().join("second.scss"), "body {}")?;
    match timeout(Duration::from_millis(500), rt_rx.recv()).await {
        Ok(Some(event)) => panic!("watcher still active after drop: {event:?}"),
        _ => {}
    }

    Ok(())
}
