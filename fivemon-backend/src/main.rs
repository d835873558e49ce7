use chrono::TimeDelta;
use fivemon_backend::fetcher::SnapshotFetcher;
use fivemon_backend::poller::{Poller, run_daily_reset};
use fivemon_backend::{Config, create_app, helpers, logging};
use fivemon_store::{Store, StoreSettings};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables or use defaults
    let config = Config::from_env();

    // Initialize tracing for structured logging
    let _log_guard = logging::init(config.log_dir.as_deref())?;
    tracing::info!("Starting FiveM monitor v{}...", fivemon_backend::API_VERSION);
    if let Some(dir) = &config.log_dir {
        tracing::info!("Writing logs to {}", dir.join(logging::LOG_FILE_NAME).display());
    }
    tracing::info!(
        "Configuration: port={}, upstream={}, max_players={}, poll={}s, fetch_timeout={}s, static_dir={}",
        config.port,
        config.upstream_address,
        config.max_players,
        config.poll_interval.as_secs(),
        config.fetch_timeout.as_secs(),
        config.static_dir.display()
    );
    tracing::info!(
        "Rate limit: {}/min per IP (burst {}), body_limit={}KB, timeout={}s",
        config.rate_limit_per_min,
        config.rate_limit_burst,
        config.request_body_limit / 1024,
        config.request_timeout.as_secs()
    );

    let store = Store::with_settings(
        StoreSettings {
            session_ttl: TimeDelta::days(config.session_ttl_days),
            ..Default::default()
        },
        helpers::now(),
    );
    let fetcher = SnapshotFetcher::new(config.upstream_url(), config.fetch_timeout)?;
    let poller = Poller::new(
        store.clone(),
        fetcher,
        config.poll_interval,
        config.max_players,
    );

    let shutdown = CancellationToken::new();
    let poll_task = tokio::spawn(poller.run(shutdown.clone()));
    let reset_task = tokio::spawn(run_daily_reset(store.clone(), shutdown.clone()));

    let app = create_app(store, &config);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    let server_token = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { server_token.cancelled().await })
    .await?;

    shutdown.cancel();
    let _ = tokio::join!(poll_task, reset_task);
    tracing::info!("Server stopped cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
