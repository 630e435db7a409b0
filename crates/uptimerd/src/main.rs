//! uptimerd: the uptime notifier daemon.
//!
//! Single binary that assembles all uptimer subsystems:
//! - State store (redb) holding the monitor config
//! - HTTP prober
//! - Webhook notifier
//! - Scheduler + debounce tracker
//! - Command API + keep-alive endpoint
//!
//! # Usage
//!
//! ```text
//! uptimerd init-config > uptimer.toml
//! uptimerd run --config uptimer.toml --data-dir /var/lib/uptimer
//! ```

mod config;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use uptimer_api::Commands;
use uptimer_health::{HttpProber, Scheduler};
use uptimer_notify::WebhookNotifier;
use uptimer_state::{ConfigStore, StateStore};

use crate::config::DaemonConfig;

#[derive(Parser)]
#[command(name = "uptimerd", about = "uptimer daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor the configured endpoint and serve the command API.
    Run {
        /// Daemon config file. Missing file means built-in defaults.
        #[arg(long, default_value = "uptimer.toml")]
        config: PathBuf,

        /// Data directory for persistent state.
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Port to listen on (overrides the config file).
        #[arg(long, env = "PORT")]
        port: Option<u16>,

        /// Default webhook URL (overrides the config file).
        #[arg(long, env = "UPTIMER_WEBHOOK_URL", hide_env_values = true)]
        webhook_url: Option<String>,
    },

    /// Print a starter uptimer.toml to stdout.
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,uptimerd=debug,uptimer_health=debug,uptimer_api=debug",
                )
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            data_dir,
            port,
            webhook_url,
        } => {
            let mut daemon = load_daemon_config(&config)?;
            if let Some(port) = port {
                daemon.server.port = port;
            }
            if webhook_url.is_some() {
                daemon.notify.webhook_url = webhook_url;
            }
            daemon.validate()?;
            run(daemon, data_dir).await
        }
        Command::InitConfig => {
            print!("{}", DaemonConfig::scaffold().to_toml_string()?);
            Ok(())
        }
    }
}

fn load_daemon_config(path: &Path) -> anyhow::Result<DaemonConfig> {
    if path.exists() {
        let config = DaemonConfig::from_file(path)?;
        info!(?path, "daemon config loaded");
        Ok(config)
    } else {
        info!(?path, "no daemon config file, using defaults");
        Ok(DaemonConfig::default())
    }
}

async fn run(daemon: DaemonConfig, data_dir: PathBuf) -> anyhow::Result<()> {
    info!("uptimer daemon starting");

    // Ensure data directory exists.
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("uptimer.redb");

    // ── Initialize subsystems ──────────────────────────────────

    // State store.
    let store = StateStore::open(&db_path)?;
    if store.seed_config(&daemon.seed_config())? {
        info!("monitor config seeded from daemon config");
    }
    let store: Arc<dyn ConfigStore> = Arc::new(store);

    // Prober and notifier.
    let prober = Arc::new(HttpProber::new()?);
    let mut notifier = WebhookNotifier::new(daemon.notify.webhook_url.clone())?;
    for (channel, url) in &daemon.notify.channels {
        notifier = notifier.with_channel(channel.clone(), url.clone());
    }
    if daemon.notify.webhook_url.is_none() && daemon.notify.channels.is_empty() {
        warn!("no webhook configured, alerts will fail to send");
    }

    // Scheduler.
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        prober,
        Arc::new(notifier),
        daemon.scheduler_settings(),
    ));

    match store.load_config() {
        Ok(config) if !config.monitoring_enabled => {
            info!("monitoring disabled, waiting for a toggle command");
        }
        Ok(config) => {
            info!(url = %config.target_url, interval = ?config.poll_interval(), "monitoring enabled");
            scheduler.start().await;
        }
        Err(e) => {
            // The timer retries the config on every tick.
            warn!(error = %e, "monitor config unavailable at startup");
            scheduler.start().await;
        }
    }

    // ── Start API server ───────────────────────────────────────

    let commands = Commands::new(store, scheduler.clone());
    let router = uptimer_api::build_router(commands);
    let addr = SocketAddr::from(([0, 0, 0, 0], daemon.server.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    scheduler.stop().await;

    info!("uptimer daemon stopped");
    Ok(())
}
