use clap::Parser;
use sitewatch_server::config::ServerConfig;
use sitewatch_server::monitor::MonitorManager;
use sitewatch_server::store::{SiteStore, StatusBoard};
use sitewatch_server::web::create_axum_router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal(shutdown_tx: watch::Sender<()>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
        // Keep the sender alive so receivers don't treat this as shutdown.
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
    let _ = shutdown_tx.send(());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Logging needs log_dir, so config errors before this point go to stderr.
    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&server_config.log_dir);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        seed_sites = server_config.sites.len(),
        "Starting sitewatch server."
    );

    // --- Store Setup ---
    let store = SiteStore::with_sites(server_config.sites.clone());
    let board = StatusBoard::new();

    // --- Monitor Manager ---
    let (reconcile_tx, reconcile_rx) = mpsc::channel::<()>(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let manager = MonitorManager::new(
        store.clone(),
        board.clone(),
        Duration::from_secs(server_config.check_timeout_seconds),
    )?;
    let manager_task = tokio::spawn(manager.run(
        reconcile_rx,
        Duration::from_secs(server_config.resync_interval_seconds),
        shutdown_rx.clone(),
    ));

    // --- Axum HTTP Server Setup ---
    let app = create_axum_router(store, board, reconcile_tx);
    let addr: SocketAddr = server_config.listen_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    tokio::spawn(shutdown_signal(shutdown_tx));

    let mut server_shutdown_rx = shutdown_rx;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = server_shutdown_rx.changed().await;
        })
        .await?;

    if let Err(e) = manager_task.await {
        error!(error = %e, "Monitor manager task failed.");
    }

    Ok(())
}
