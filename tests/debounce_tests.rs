//! Change-detector tests: write bursts inside the stability window collapse
//! into exactly one event, and separate settled changes each emit one.

mod test_harness;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use gapwatch::watcher::ChangeDetector;
use test_harness::TestWorkspace;

#[tokio::test]
async fn rapid_writes_emit_exactly_one_event() {
    let ws = TestWorkspace::new();
    let config = ws.config();
    let shutdown = CancellationToken::new();
    let mut changes = ChangeDetector::new(&config).spawn(shutdown.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A writer doing read-modify-write: several writes inside the window
    ws.touch_input(r#"[{"id": 1}]"#);
    tokio::time::sleep(Duration::from_millis(30)).await;
    ws.touch_input(r#"[{"id": 1}, {"id": 2}]"#);
    tokio::time::sleep(Duration::from_millis(30)).await;
    ws.touch_input(r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#);

    let event = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .expect("change event within timeout")
        .expect("detector alive");
    assert_eq!(event.path, ws.input);

    // The burst settled; no second event follows
    let extra = tokio::time::timeout(Duration::from_millis(500), changes.recv()).await;
    assert!(extra.is_err(), "burst must collapse into one event");

    shutdown.cancel();
}

#[tokio::test]
async fn separate_settled_changes_emit_separate_events() {
    let ws = TestWorkspace::new();
    let config = ws.config();
    let shutdown = CancellationToken::new();
    let mut changes = ChangeDetector::new(&config).spawn(shutdown.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;

    ws.touch_input(r#"[{"id": 1}]"#);
    let first = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .expect("first change event")
        .expect("detector alive");
    assert_eq!(first.path, ws.input);

    ws.touch_input(r#"[{"id": 1}, {"id": 2}]"#);
    let second = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .expect("second change event")
        .expect("detector alive");
    assert_eq!(second.path, ws.input);

    shutdown.cancel();
}

#[tokio::test]
async fn unrelated_files_do_not_trigger() {
    let ws = TestWorkspace::new();
    let config = ws.config();
    let shutdown = CancellationToken::new();
    let mut changes = ChangeDetector::new(&config).spawn(shutdown.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A sibling file in the watched directory changes; the input does not
    std::fs::write(ws.input.parent().unwrap().join("other.json"), "x").unwrap();

    let event = tokio::time::timeout(Duration::from_millis(600), changes.recv()).await;
    assert!(event.is_err(), "sibling writes must not emit change events");

    shutdown.cancel();
}

#[tokio::test]
async fn shutdown_stops_the_detector() {
    let ws = TestWorkspace::new();
    let config = ws.config();
    let shutdown = CancellationToken::new();
    let mut changes = ChangeDetector::new(&config).spawn(shutdown.clone());

    shutdown.cancel();

    // The channel closes once the detector task winds down
    let closed = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .expect("detector should wind down promptly");
    assert!(closed.is_none());
}
