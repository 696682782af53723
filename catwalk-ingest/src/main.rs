//! catwalk-ingest - fashion image ingest service
//!
//! Crawls a publication's fashion section, filters and catalogs images, and
//! serves the review/learning/sync API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use catwalk_common::config::{self, TomlConfig};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catwalk_ingest::extractor::HttpPageRenderer;
use catwalk_ingest::services::CrawlScheduler;
use catwalk_ingest::AppState;

/// Command-line arguments for catwalk-ingest
#[derive(Parser, Debug)]
#[command(name = "catwalk-ingest")]
#[command(about = "Fashion image crawl, review and learning service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "CATWALK_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long, env = "CATWALK_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Path to catwalk.toml
    #[arg(short, long, env = "CATWALK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before logging starts so its level can seed the filter;
    // where it came from is logged once the subscriber is up
    let config_path =
        config::resolve_config_path(args.config.as_deref(), args.root_folder.as_deref());
    let (toml_config, config_source) = TomlConfig::load(config_path.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "catwalk_ingest={level},catwalk_common={level},tower_http=info",
                    level = toml_config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting catwalk-ingest v{}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = config::ensure_root_folder(&root_folder)
        .with_context(|| format!("Failed to initialize root folder {}", root_folder.display()))?;
    info!("Database: {}", db_path.display());

    let db_pool = catwalk_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let renderer = Arc::new(HttpPageRenderer::new(
        toml_config.crawl.user_agent.clone(),
        Duration::from_secs(toml_config.crawl.page_timeout_secs),
    ));

    let host = toml_config.server.host.clone();
    let port = args.port.unwrap_or(toml_config.server.port);

    let state = AppState::new(db_pool, toml_config, renderer);

    let scheduler_shutdown = CancellationToken::new();
    let scheduler = CrawlScheduler::from_state(state.clone())
        .map(|scheduler| tokio::spawn(scheduler.run(scheduler_shutdown.clone())));
    if scheduler.is_none() {
        info!("Scheduled crawls disabled");
    }

    let app = catwalk_ingest::build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scheduler_shutdown.cancel();
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            error!("Crawl scheduler task failed: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
