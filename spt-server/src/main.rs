//! spt-server - Student Productivity Tracker service
//!
//! Serves the student dashboard, usage tracking, coding-profile refresh and
//! admin APIs over HTTP, with a Server-Sent Events stream per identity.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use spt_common::config::{ConfigSource, Overrides, ServiceConfig};
use spt_common::events::LiveHub;
use spt_server::assistant::{Assistant, OpenAiClient};
use spt_server::fetchers::LeetCodeClient;
use spt_server::generator::RandomProfileGenerator;
use spt_server::store::{JsonFileStore, StoreHandle};
use spt_server::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for spt-server
#[derive(Parser, Debug)]
#[command(name = "spt-server")]
#[command(about = "Student Productivity Tracker service")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config_dir>/spt/config.toml)
    #[arg(short, long, env = "SPT_CONFIG")]
    config: Option<PathBuf>,

    /// JSON store document
    #[arg(short, long)]
    data_file: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Bearer token for the admin endpoints
    #[arg(long)]
    admin_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ServiceConfig::resolve(Overrides {
        config_file: args.config,
        data_file: args.data_file,
        bind: args.bind,
        port: args.port,
        admin_token: args.admin_token,
    })
    .context("Failed to resolve configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("spt_server={0},spt_common={0},tower_http={0}", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification immediately after tracing init
    info!(
        "Starting Student Productivity Tracker (spt-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config.config_source {
        ConfigSource::Loaded(path) => info!("Loaded config file: {}", path.display()),
        ConfigSource::Missing(path) => warn!(
            "Config file not found: {} (using environment and defaults)",
            path.display()
        ),
        ConfigSource::Unavailable => {
            warn!("No config directory on this platform (using environment and defaults)")
        }
    }

    let backend = JsonFileStore::open(&config.data_file).with_context(|| {
        format!("Failed to open store at {}", config.data_file.display())
    })?;
    info!("Store document: {}", backend.path().display());

    if config.admin_token.is_none() {
        warn!("No admin token configured; admin endpoints will refuse every request");
    }

    let leetcode = LeetCodeClient::new(config.fetch_timeout)
        .context("Failed to create LeetCode client")?;

    let mut assistant = Assistant::new(config.fixed_ai_response.clone());
    match &config.openai_api_key {
        Some(key) => {
            let client = OpenAiClient::new(
                key.clone(),
                config.openai_model.clone(),
                config.fetch_timeout,
            )
            .context("Failed to create chat client")?;
            info!("Chat fallback model: {}", client.model());
            assistant = assistant.with_model(Arc::new(client));
        }
        None => info!("No chat model configured; unmatched questions get the fixed response"),
    }

    let state = AppState::new(
        StoreHandle::new(Arc::new(backend)),
        Arc::new(RandomProfileGenerator::new()),
        LiveHub::new(config.live_capacity),
    )
    .with_fetcher(Arc::new(leetcode))
    .with_admin_token(config.admin_token.clone())
    .with_fetch_timeout(config.fetch_timeout)
    .with_assistant(assistant);

    let app = build_router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("spt-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
