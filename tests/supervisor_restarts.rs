// tests/supervisor_restarts.rs

#![cfg(unix)]

use std::error::Error;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use gantry::engine::RuntimeEvent;
use gantry::errors::GantryError;
use gantry::serve::{reload, ServeSettings, Supervisor};
use gantry_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn settings(cmd: &str, max_restarts: u32) -> ServeSettings {
    ServeSettings {
        cmd: cmd.to_string(),
        max_restarts,
        restart_delay: Duration::from_millis(10),
        ready_pattern: None,
    }
}

#[tokio::test]
async fn stop_terminates_a_running_process_cleanly() -> TestResult {
    init_tracing();

    let (hub, listener) = reload::bind("127.0.0.1:0").await?;
    let (rt_tx, mut rt_rx) = mpsc::channel::<RuntimeEvent>(8);

    let supervisor = Supervisor::spawn(settings("sleep 30", 3), hub, rt_tx);
    sleep(Duration::from_millis(100)).await;

    timeout(Duration::from_secs(3), supervisor.stop())
        .await
        .expect("stop should not hang")?;

    // A clean stop never asks the runtime to shut down.
    assert!(rt_rx.try_recv().is_err());

    listener.stop();
    Ok(())
}

#[tokio::test]
async fn exceeding_restart_budget_fails_and_requests_shutdown() -> TestResult {
    init_tracing();

    let (hub, listener) = reload::bind("127.0.0.1:0").await?;
    let (rt_tx, mut rt_rx) = mpsc::channel::<RuntimeEvent>(8);

    let supervisor = Supervisor::spawn(settings("exit 7", 2), hub, rt_tx);

    // Crash-looping with a 10ms delay burns through the budget quickly;
    // the supervisor must then ask the runtime to wind down.
    let event = timeout(Duration::from_secs(5), rt_rx.recv())
        .await
        .expect("no shutdown request before timeout");
    assert!(matches!(event, Some(RuntimeEvent::ShutdownRequested)));

    let err = supervisor.stop().await.unwrap_err();
    assert!(matches!(
        err,
        GantryError::ProcessSupervision { restarts: 2 }
    ));

    listener.stop();
    Ok(())
}

#[tokio::test]
async fn restart_broadcasts_reload_once_ready() -> TestResult {
    init_tracing();

    let (hub, listener) = reload::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr();

    let observer = TcpStream::connect(addr).await?;
    sleep(Duration::from_millis(100)).await;

    let (rt_tx, _rt_rx) = mpsc::channel::<RuntimeEvent>(8);
    let mut cfg = settings("echo listening && sleep 0.2", 1);
    cfg.ready_pattern = Some(regex::Regex::new("listening")?);

    // First start announces nothing; the process then exits and the one
    // permitted restart must broadcast a reload once ready again.
    let supervisor = Supervisor::spawn(cfg, hub, rt_tx);

    let mut lines = BufReader::new(observer).lines();
    let line = timeout(Duration::from_secs(5), lines.next_line())
        .await
        .expect("no reload notification after restart")?;
    assert_eq!(line.as_deref(), Some("reload"));

    let _ = supervisor.stop().await;
    listener.stop();
    Ok(())
}
