//! uptimer-api: the operator command surface.
//!
//! [`Commands`] implements the operations (retarget, interval, toggle,
//! reset, history, one-off check, status). [`build_router`] exposes them
//! over HTTP. Every `/api/v1` call must carry an `x-channel-id` header
//! matching the configured command channel.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Keep-alive |
//! | GET | `/api/v1/status` | Config, debounce state, timer state |
//! | GET | `/api/v1/check` | Probe the target now, bypassing debounce |
//! | GET | `/api/v1/history` | Previously monitored URLs |
//! | PUT | `/api/v1/target` | Set the target URL |
//! | PUT | `/api/v1/interval` | Set the poll interval (seconds) |
//! | PUT | `/api/v1/notify-target` | Set or clear the alert mention |
//! | PUT | `/api/v1/command-channel` | Move the command channel |
//! | POST | `/api/v1/monitoring/toggle` | Enable/disable monitoring |
//! | POST | `/api/v1/reset` | Reset debounce state and restart |

pub mod commands;
pub mod handlers;

pub use commands::{CheckReport, CommandError, CommandResult, Commands, StatusReport};
pub use handlers::CHANNEL_HEADER;

use axum::Router;
use axum::routing::{get, post, put};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub commands: Commands,
}

/// Build the complete router (keep-alive + command API).
pub fn build_router(commands: Commands) -> Router {
    let api_state = ApiState { commands };

    let api_routes = Router::new()
        .route("/status", get(handlers::status))
        .route("/check", get(handlers::check_now))
        .route("/history", get(handlers::history))
        .route("/target", put(handlers::set_target))
        .route("/interval", put(handlers::set_interval))
        .route("/notify-target", put(handlers::set_notify_target))
        .route("/command-channel", put(handlers::set_command_channel))
        .route("/monitoring/toggle", post(handlers::toggle_monitoring))
        .route("/reset", post(handlers::force_reset))
        .with_state(api_state);

    Router::new()
        .route("/", get(handlers::keep_alive))
        .nest("/api/v1", api_routes)
}
