//! Command route handlers.
//!
//! Each `/api/v1` handler first checks that the caller's `x-channel-id`
//! header names the configured command channel, then runs one command and
//! returns a JSON envelope.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;

use crate::ApiState;
use crate::commands::CommandError;

/// Header carrying the id of the channel a command came from.
pub const CHANNEL_HEADER: &str = "x-channel-id";

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

fn command_error(e: CommandError) -> Response {
    let status = match e {
        CommandError::InvalidUrl(_)
        | CommandError::IntervalTooSmall(_)
        | CommandError::InvalidChannel => StatusCode::BAD_REQUEST,
        CommandError::NoTarget => StatusCode::CONFLICT,
        CommandError::ConfigUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CommandError::ConfigPersist(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(&e.to_string(), status)
}

fn respond<T: serde::Serialize>(result: Result<T, CommandError>) -> Response {
    match result {
        Ok(data) => ApiResponse::ok(data).into_response(),
        Err(e) => command_error(e),
    }
}

/// Reject callers that are not in the command channel.
fn authorize(state: &ApiState, headers: &HeaderMap) -> Result<(), Response> {
    let channel = headers
        .get(CHANNEL_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match state.commands.authorize(channel) {
        Ok(true) => Ok(()),
        Ok(false) => {
            warn!(%channel, "command from unauthorized channel rejected");
            Err(error_response(
                "commands are not allowed from this channel",
                StatusCode::FORBIDDEN,
            ))
        }
        Err(e) => Err(command_error(e)),
    }
}

// ── Keep-alive ─────────────────────────────────────────────────

/// GET /
pub async fn keep_alive() -> &'static str {
    "uptimer is running"
}

// ── Queries ────────────────────────────────────────────────────

/// GET /api/v1/status
pub async fn status(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    respond(state.commands.status().await)
}

/// GET /api/v1/check
pub async fn check_now(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    respond(state.commands.check_now().await)
}

/// GET /api/v1/history
pub async fn history(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    respond(state.commands.history())
}

// ── Mutations ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TargetRequest {
    pub url: String,
}

/// PUT /api/v1/target
pub async fn set_target(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<TargetRequest>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    respond(state.commands.set_target_url(&req.url).await)
}

#[derive(Deserialize)]
pub struct IntervalRequest {
    pub seconds: u64,
}

/// PUT /api/v1/interval
pub async fn set_interval(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<IntervalRequest>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    respond(state.commands.set_poll_interval(req.seconds).await)
}

#[derive(Deserialize)]
pub struct ChannelRequest {
    #[serde(default)]
    pub id: Option<String>,
}

/// PUT /api/v1/notify-target: `{"id": null}` clears the mention.
pub async fn set_notify_target(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<ChannelRequest>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    respond(state.commands.set_notification_target(req.id).await)
}

/// PUT /api/v1/command-channel
pub async fn set_command_channel(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<ChannelRequest>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    let id = req.id.unwrap_or_default();
    respond(state.commands.set_command_channel(&id).await)
}

/// POST /api/v1/monitoring/toggle
pub async fn toggle_monitoring(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    respond(
        state
            .commands
            .toggle_monitoring()
            .await
            .map(|enabled| serde_json::json!({ "monitoringEnabled": enabled })),
    )
}

/// POST /api/v1/reset
pub async fn force_reset(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    state.commands.force_reset().await;
    ApiResponse::ok("reset").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use uptimer_health::{ProbeOutcome, Prober, Scheduler, SchedulerSettings};
    use uptimer_notify::{ChannelRef, Notifier, NotifyError};
    use uptimer_state::{ConfigStore, MonitorConfig, StateStore};

    use crate::commands::Commands;

    struct UpProber;

    #[async_trait]
    impl Prober for UpProber {
        async fn probe(&self, _url: &str, _timeout: Duration) -> ProbeOutcome {
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

    fn test_state(seed: bool) -> (ApiState, StateStore) {
        let store = StateStore::open_in_memory().unwrap();
        if seed {
            store
                .save_config(&MonitorConfig {
                    target_url: "https://site.example/".to_string(),
                    poll_interval_millis: 10_000,
                    command_channel_id: "ops".to_string(),
                    ..MonitorConfig::default()
                })
                .unwrap();
        }
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(store.clone()),
            Arc::new(UpProber),
            Arc::new(SilentNotifier),
            SchedulerSettings::default(),
        ));
        let commands = Commands::new(Arc::new(store.clone()), scheduler);
        (ApiState { commands }, store)
    }

    fn channel(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CHANNEL_HEADER, HeaderValue::from_str(id).unwrap());
        headers
    }

    #[tokio::test]
    async fn keep_alive_answers() {
        assert_eq!(keep_alive().await, "uptimer is running");
    }

    #[tokio::test]
    async fn missing_channel_is_forbidden() {
        let (state, _) = test_state(true);
        let resp = status(State(state), HeaderMap::new()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn wrong_channel_is_forbidden() {
        let (state, store) = test_state(true);
        let req = TargetRequest {
            url: "https://x.com".to_string(),
        };
        let resp = set_target(State(state), channel("random"), Json(req)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(store.load_config().unwrap().target_url, "https://site.example/");
    }

    #[tokio::test]
    async fn unavailable_config_is_service_unavailable() {
        let (state, _) = test_state(false);
        let resp = history(State(state), channel("ops")).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn invalid_url_is_bad_request() {
        let (state, _) = test_state(true);
        let req = TargetRequest {
            url: "ftp://x".to_string(),
        };
        let resp = set_target(State(state), channel("ops"), Json(req)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn small_interval_is_bad_request() {
        let (state, _) = test_state(true);
        let resp = set_interval(State(state), channel("ops"), Json(IntervalRequest { seconds: 3 })).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn set_target_updates_store() {
        let (state, store) = test_state(true);
        let req = TargetRequest {
            url: "https://x.com".to_string(),
        };
        let resp = set_target(State(state), channel("ops"), Json(req)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let config = store.load_config().unwrap();
        assert_eq!(config.target_url, "https://x.com");
        assert_eq!(config.url_history, vec!["https://site.example/"]);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_and_reset_succeed() {
        let (state, store) = test_state(true);

        let resp = toggle_monitoring(State(state.clone()), channel("ops")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!store.load_config().unwrap().monitoring_enabled);

        let resp = force_reset(State(state), channel("ops")).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn check_without_target_conflicts() {
        let (state, store) = test_state(true);
        let mut config = store.load_config().unwrap();
        config.target_url.clear();
        store.save_config(&config).unwrap();

        let resp = check_now(State(state), channel("ops")).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
