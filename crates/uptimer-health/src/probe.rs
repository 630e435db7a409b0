//! HTTP reachability probe.
//!
//! A probe never fails: connection errors, timeouts and non-2xx answers
//! all come back as `reachable = false`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    /// A response with a 2xx status arrived in time.
    pub reachable: bool,
    /// HTTP status, when a response arrived at all.
    pub status: Option<u16>,
    pub elapsed_ms: u64,
}

impl ProbeOutcome {
    pub fn up() -> Self {
        Self {
            reachable: true,
            status: Some(200),
            elapsed_ms: 0,
        }
    }

    pub fn down() -> Self {
        Self {
            reachable: false,
            status: None,
            elapsed_ms: 0,
        }
    }
}

/// Checks whether a URL answers.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}

/// Probes with a plain `GET` over HTTP or HTTPS.
#[derive(Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("uptimer-health/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let started = Instant::now();
        let result = tokio::time::timeout(timeout, self.client.get(url).send()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(resp)) => {
                let status = resp.status();
                if !status.is_success() {
                    debug!(%status, %url, "probe non-2xx");
                }
                ProbeOutcome {
                    reachable: status.is_success(),
                    status: Some(status.as_u16()),
                    elapsed_ms,
                }
            }
            Ok(Err(e)) => {
                debug!(error = %e, %url, "probe request failed");
                ProbeOutcome {
                    reachable: false,
                    status: None,
                    elapsed_ms,
                }
            }
            Err(_) => {
                debug!(%url, ?timeout, "probe timed out");
                ProbeOutcome {
                    reachable: false,
                    status: None,
                    elapsed_ms,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    async fn spawn_target() -> SocketAddr {
        let router = Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route("/created", get(|| async { StatusCode::CREATED }))
            .route("/boom", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn success_status_is_reachable() {
        let addr = spawn_target().await;
        let prober = HttpProber::new().unwrap();

        let outcome = prober.probe(&format!("http://{addr}/ok"), Duration::from_secs(2)).await;
        assert!(outcome.reachable);
        assert_eq!(outcome.status, Some(200));

        let outcome = prober.probe(&format!("http://{addr}/created"), Duration::from_secs(2)).await;
        assert!(outcome.reachable);
        assert_eq!(outcome.status, Some(201));
    }

    #[tokio::test]
    async fn error_status_is_unreachable() {
        let addr = spawn_target().await;
        let prober = HttpProber::new().unwrap();

        for (path, code) in [("/boom", 503), ("/missing", 404)] {
            let outcome = prober.probe(&format!("http://{addr}{path}"), Duration::from_secs(2)).await;
            assert!(!outcome.reachable);
            assert_eq!(outcome.status, Some(code));
        }
    }

    #[tokio::test]
    async fn timeout_is_unreachable() {
        let addr = spawn_target().await;
        let prober = HttpProber::new().unwrap();

        let outcome = prober
            .probe(&format!("http://{addr}/slow"), Duration::from_millis(100))
            .await;
        assert!(!outcome.reachable);
        assert_eq!(outcome.status, None);
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let prober = HttpProber::new().unwrap();
        let outcome = prober.probe("http://127.0.0.1:1/", Duration::from_millis(500)).await;
        assert!(!outcome.reachable);
        assert_eq!(outcome.status, None);
    }

    #[tokio::test]
    async fn malformed_url_is_unreachable() {
        let prober = HttpProber::new().unwrap();
        let outcome = prober.probe("http://", Duration::from_millis(500)).await;
        assert!(!outcome.reachable);
    }
}
