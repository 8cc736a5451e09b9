//! # Pipeline Integration Tests
//!
//! Drives a full `Dispatcher` through in-process transports: a channel-backed
//! push feed and a scripted poll source. Assertions are made on the published
//! `SyncViews`, exactly as a renderer would observe them.

use std::time::Duration;

use futures_channel::mpsc::{unbounded, UnboundedSender};
use futures_util::future::BoxFuture;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::timeout;

use lib_dashsync::core::RawPayload;
use lib_dashsync::{
    Dispatcher, DispatcherState, PollAdapter, PollOutcome, PollSource, PushAdapter, StreamStatus,
    SyncError, TransportAdapter, TransportError,
};

type Feed = UnboundedSender<Result<RawPayload, TransportError>>;

/// Starts a dispatcher on a push feed the test can write to.
fn start_push() -> (Dispatcher, Feed) {
    let (feed, frames) = unbounded();
    let mut dispatcher = Dispatcher::new(2);
    dispatcher
        .start(TransportAdapter::Push(PushAdapter::from_stream(frames)))
        .unwrap();
    (dispatcher, feed)
}

fn send(feed: &Feed, body: serde_json::Value) {
    feed.unbounded_send(Ok(RawPayload::new(body.to_string()))).unwrap();
}

/// Waits (bounded) until the watched value satisfies `pred`, then returns a copy.
async fn wait_until<T: Clone>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) -> T {
    timeout(Duration::from_secs(2), rx.wait_for(pred))
        .await
        .expect("view did not reach the expected state in time")
        .expect("dispatcher dropped")
        .clone()
}

#[tokio::test]
async fn test_repeated_alert_updates_single_entry() {
    let (mut dispatcher, feed) = start_push();
    let mut views = dispatcher.views();

    send(&feed, json!({"content": "A", "name": "alert", "value": 5, "triggered": true}));
    send(&feed, json!({"content": "A", "name": "alert", "value": 9, "triggered": true}));

    let alerts = wait_until(&mut views.alerts, |a| a.iter().any(|x| x.value == 9.0)).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].content, "A");

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_untriggered_first_sighting_never_visible() {
    let (mut dispatcher, feed) = start_push();
    let mut views = dispatcher.views();

    send(&feed, json!({"content": "B", "name": "warning", "value": 1, "triggered": false}));
    // A marker alert proves the first event has been processed.
    send(&feed, json!({"content": "marker", "name": "warning", "value": 1, "triggered": true}));

    let alerts = wait_until(&mut views.alerts, |a| !a.is_empty()).await;
    assert!(alerts.iter().all(|a| a.content != "B"));

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_untriggered_update_hides_then_retrigger_keeps_position() {
    let (mut dispatcher, feed) = start_push();
    let mut views = dispatcher.views();

    send(&feed, json!({"content": "B", "name": "alert", "value": 1, "triggered": true}));
    send(&feed, json!({"content": "C", "name": "alert", "value": 1, "triggered": true}));
    wait_until(&mut views.alerts, |a| a.len() == 2).await;

    send(&feed, json!({"content": "B", "name": "alert", "value": 2, "triggered": false}));
    let alerts = wait_until(&mut views.alerts, |a| a.len() == 1).await;
    assert_eq!(alerts[0].content, "C");

    // B is still tracked, so it comes back in place (behind C) rather than in front.
    send(&feed, json!({"content": "B", "name": "alert", "value": 3, "triggered": true}));
    let alerts = wait_until(&mut views.alerts, |a| a.len() == 2).await;
    let order: Vec<&str> = alerts.iter().map(|a| a.content.as_str()).collect();
    assert_eq!(order, vec!["C", "B"]);

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_message_window_keeps_two_most_recent() {
    let (mut dispatcher, feed) = start_push();
    let mut views = dispatcher.views();

    for content in ["one", "two", "three"] {
        send(&feed, json!({"name": "info", "content": content, "timeout": 60}));
    }

    let messages = wait_until(&mut views.messages, |m| m.iter().any(|x| x.content == "three")).await;
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["two", "three"]);

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_short_lived_message_expires() {
    let (mut dispatcher, feed) = start_push();
    let mut views = dispatcher.views();

    send(&feed, json!({"name": "info", "content": "stays", "timeout": 60}));
    send(&feed, json!({"name": "warning", "content": "brief", "timeout": 0.01}));

    wait_until(&mut views.messages, |m| m.iter().any(|x| x.content == "brief")).await;
    let messages = wait_until(&mut views.messages, |m| m.iter().all(|x| x.content != "brief")).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "stays");
    assert_eq!(messages[0].severity, "info");

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_bad_payloads_do_not_stop_the_pipeline() {
    let (mut dispatcher, feed) = start_push();
    let mut views = dispatcher.views();

    feed.unbounded_send(Ok(RawPayload::new("not json"))).unwrap();
    send(&feed, json!({"triggered": true}));
    send(&feed, json!({"name": "info"}));
    send(&feed, json!({"content": "oil", "name": "alert", "value": 130, "triggered": true}));

    let alerts = wait_until(&mut views.alerts, |a| !a.is_empty()).await;
    assert_eq!(alerts[0].content, "oil");
    assert_eq!(*views.status.borrow(), StreamStatus::Streaming);

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_push_failure_is_terminal_but_messages_still_expire() {
    let (mut dispatcher, feed) = start_push();
    let mut views = dispatcher.views();

    send(&feed, json!({"name": "info", "content": "fading", "timeout": 0.2}));
    feed.unbounded_send(Err(TransportError::Source("link lost".into()))).unwrap();

    let status = timeout(Duration::from_secs(2), views.terminated()).await.unwrap();
    assert_eq!(status, StreamStatus::Failed("link lost".into()));
    assert_eq!(dispatcher.state(), DispatcherState::Running);

    wait_until(&mut views.messages, |m| m.is_empty()).await;

    dispatcher.stop().await.unwrap();
    assert_eq!(*views.status.borrow(), StreamStatus::Stopped);
}

#[tokio::test]
async fn test_remote_close_is_reported() {
    let (mut dispatcher, feed) = start_push();
    let mut views = dispatcher.views();

    send(&feed, json!({"content": "A", "name": "alert", "value": 1, "triggered": true}));
    drop(feed);

    let status = timeout(Duration::from_secs(2), views.terminated()).await.unwrap();
    assert!(matches!(status, StreamStatus::Failed(_)));
    // Frames delivered before the close were still routed.
    assert_eq!(views.alerts.borrow().len(), 1);

    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_cancels_timers_and_rejects_restart() {
    let (mut dispatcher, feed) = start_push();
    let mut views = dispatcher.views();

    send(&feed, json!({"name": "info", "content": "pending", "timeout": 0.1}));
    wait_until(&mut views.messages, |m| m.len() == 1).await;

    dispatcher.stop().await.unwrap();
    assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    assert_eq!(*views.status.borrow(), StreamStatus::Stopped);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(views.messages.borrow().len(), 1, "disposed timers must not fire");

    let (_feed, frames) = unbounded();
    let err = dispatcher
        .start(TransportAdapter::Push(PushAdapter::from_stream(frames)))
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::InvalidTransition {
            from: DispatcherState::Stopped,
            to: DispatcherState::Running
        }
    ));

    // Stopping twice is harmless.
    dispatcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_from_idle() {
    let mut dispatcher = Dispatcher::new(2);
    let mut views = dispatcher.views();
    assert_eq!(*views.status.borrow(), StreamStatus::Idle);

    dispatcher.stop().await.unwrap();
    assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    assert_eq!(views.terminated().await, StreamStatus::Stopped);
}

/// Hands out queued bodies, then answers "no data" after a short hold.
struct QueueSource {
    bodies: Vec<&'static str>,
}

impl PollSource for QueueSource {
    fn poll_once(&mut self) -> BoxFuture<'_, Result<PollOutcome, TransportError>> {
        Box::pin(async move {
            if self.bodies.is_empty() {
                tokio::time::sleep(Duration::from_millis(20)).await;
                return Ok(PollOutcome::NoData);
            }
            Ok(PollOutcome::Payload(RawPayload::new(self.bodies.remove(0))))
        })
    }
}

#[tokio::test]
async fn test_poll_transport_feeds_both_stores() {
    let source = QueueSource {
        bodies: vec![
            r#"{"content":"coolant","name":"warning","value":104,"triggered":true}"#,
            r#"{"name":"info","content":"pit in 2 laps","timeout":60}"#,
        ],
    };
    let mut dispatcher = Dispatcher::new(2);
    let mut views = dispatcher.views();
    dispatcher
        .start(TransportAdapter::Poll(PollAdapter::new(source, Duration::from_millis(50))))
        .unwrap();

    let alerts = wait_until(&mut views.alerts, |a| !a.is_empty()).await;
    assert_eq!(alerts[0].content, "coolant");
    let messages = wait_until(&mut views.messages, |m| !m.is_empty()).await;
    assert_eq!(messages[0].content, "pit in 2 laps");
    assert_eq!(*views.status.borrow(), StreamStatus::Streaming);

    dispatcher.stop().await.unwrap();
    assert_eq!(*views.status.borrow(), StreamStatus::Stopped);
}

/// A poll endpoint that answers every request at once with no data.
struct InstantNoData;

impl PollSource for InstantNoData {
    fn poll_once(&mut self) -> BoxFuture<'_, Result<PollOutcome, TransportError>> {
        Box::pin(async { Ok(PollOutcome::NoData) })
    }
}

#[tokio::test]
async fn test_stop_returns_with_an_instantly_ready_poll_source() {
    let mut dispatcher = Dispatcher::new(2);
    let mut views = dispatcher.views();
    dispatcher
        .start(TransportAdapter::Poll(PollAdapter::new(InstantNoData, Duration::from_millis(50))))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    timeout(Duration::from_secs(3), dispatcher.stop())
        .await
        .expect("stop() did not return")
        .unwrap();
    assert_eq!(views.terminated().await, StreamStatus::Stopped);
}

#[tokio::test]
async fn test_stop_returns_with_an_always_ready_push_feed() {
    let frames = futures_util::stream::repeat_with(|| {
        Ok(RawPayload::new(r#"{"name":"info","content":"tick","timeout":60}"#))
    });
    let mut dispatcher = Dispatcher::new(2);
    let mut views = dispatcher.views();
    dispatcher
        .start(TransportAdapter::Push(PushAdapter::from_stream(frames)))
        .unwrap();

    wait_until(&mut views.messages, |m| m.len() == 2).await;
    timeout(Duration::from_secs(3), dispatcher.stop())
        .await
        .expect("stop() did not return")
        .unwrap();
    assert_eq!(*views.status.borrow(), StreamStatus::Stopped);
}
