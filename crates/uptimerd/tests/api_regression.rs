//! API regression tests.
//!
//! Drives the full router the daemon serves: keep-alive, channel
//! authorization, and each command round-tripping through the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use uptimer_api::{CHANNEL_HEADER, Commands, build_router};
use uptimer_health::{ProbeOutcome, Prober, Scheduler, SchedulerSettings};
use uptimer_notify::{ChannelRef, Notifier, NotifyError};
use uptimer_state::*;

const OPS: &str = "1441682465122025504";

#[derive(Default)]
struct CountingProber {
    calls: AtomicUsize,
}

#[async_trait]
impl Prober for CountingProber {
    async fn probe(&self, _url: &str, _timeout: Duration) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ProbeOutcome::up()
    }
}

struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn notify(&self, _channel: &ChannelRef, _text: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

struct Harness {
    router: Router,
    store: StateStore,
    scheduler: Arc<Scheduler>,
    prober: Arc<CountingProber>,
}

fn harness() -> Harness {
    let store = StateStore::open_in_memory().unwrap();
    store
        .save_config(&MonitorConfig {
            target_url: "https://oop.example.uk/".to_string(),
            poll_interval_millis: 60_000,
            command_channel_id: OPS.to_string(),
            ..MonitorConfig::default()
        })
        .unwrap();

    let prober = Arc::new(CountingProber::default());
    let scheduler = Arc::new(Scheduler::new(
        Arc::new(store.clone()),
        prober.clone(),
        Arc::new(SilentNotifier),
        SchedulerSettings::default(),
    ));
    let commands = Commands::new(Arc::new(store.clone()), scheduler.clone());

    Harness {
        router: build_router(commands),
        store,
        scheduler,
        prober,
    }
}

fn command(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CHANNEL_HEADER, OPS);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn keep_alive_needs_no_channel() {
    let h = harness();
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();

    let resp = h.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"uptimer is running");
}

#[tokio::test]
async fn commands_without_channel_are_forbidden() {
    let h = harness();
    let req = Request::builder()
        .uri("/api/v1/history")
        .body(Body::empty())
        .unwrap();

    let resp = h.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = json_body(resp).await;
    assert_eq!(body["success"], false);
}

#[tokio::test(start_paused = true)]
async fn set_target_moves_old_url_to_history() {
    let h = harness();

    let req = command(
        "PUT",
        "/api/v1/target",
        Some(serde_json::json!({ "url": "https://x.com" })),
    );
    let resp = h.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = h
        .router
        .oneshot(command("GET", "/api/v1/history", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["data"], serde_json::json!(["https://oop.example.uk/"]));

    assert_eq!(h.store.load_config().unwrap().target_url, "https://x.com");
    assert_eq!(
        h.scheduler.debounce().await.confirmed_status,
        uptimer_health::ConfirmedStatus::Unknown
    );
}

#[tokio::test(start_paused = true)]
async fn interval_below_minimum_is_rejected() {
    let h = harness();

    let req = command(
        "PUT",
        "/api/v1/interval",
        Some(serde_json::json!({ "seconds": 3 })),
    );
    let resp = h.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.store.load_config().unwrap().poll_interval_millis, 60_000);

    let req = command(
        "PUT",
        "/api/v1/interval",
        Some(serde_json::json!({ "seconds": 5 })),
    );
    let resp = h.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.store.load_config().unwrap().poll_interval_millis, 5_000);
    assert_eq!(h.scheduler.interval().await, Some(Duration::from_secs(5)));
}

#[tokio::test(start_paused = true)]
async fn toggle_stops_and_restarts_monitoring() {
    let h = harness();
    h.scheduler.start().await;
    assert!(h.scheduler.is_running().await);

    let resp = h
        .router
        .clone()
        .oneshot(command("POST", "/api/v1/monitoring/toggle", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["data"]["monitoringEnabled"], false);
    assert!(!h.scheduler.is_running().await);

    let resp = h
        .router
        .oneshot(command("POST", "/api/v1/monitoring/toggle", None))
        .await
        .unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["data"]["monitoringEnabled"], true);
    assert!(h.scheduler.is_running().await);
    assert!(h.store.load_config().unwrap().monitoring_enabled);
}

#[tokio::test(start_paused = true)]
async fn status_reports_config_and_debounce() {
    let h = harness();
    h.scheduler.start().await;

    let resp = h
        .router
        .oneshot(command("GET", "/api/v1/status", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    let data = &body["data"];
    assert_eq!(data["config"]["targetUrl"], "https://oop.example.uk/");
    assert_eq!(data["running"], true);
    assert_eq!(data["intervalMs"], 60_000);
    // The immediate first cycle initialized the tracker.
    assert_eq!(data["debounce"]["confirmedStatus"], "up");
    assert_eq!(data["debounce"]["pendingCounter"], 0);
    assert!(h.prober.calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn check_probes_current_target() {
    let h = harness();

    let resp = h
        .router
        .oneshot(command("GET", "/api/v1/check", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["data"]["url"], "https://oop.example.uk/");
    assert_eq!(body["data"]["reachable"], true);
    assert_eq!(h.prober.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn moving_command_channel_changes_authorization() {
    let h = harness();

    let req = command(
        "PUT",
        "/api/v1/command-channel",
        Some(serde_json::json!({ "id": "999" })),
    );
    let resp = h.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // The old channel is no longer allowed.
    let resp = h
        .router
        .oneshot(command("GET", "/api/v1/history", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(h.store.load_config().unwrap().command_channel_id, "999");
}
