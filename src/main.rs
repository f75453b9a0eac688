//! Tally Server — real-time hierarchical counter
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing_subscriber::{EnvFilter, fmt};

use tally_api::{AppState, build_router};
use tally_core::config::AppConfig;
use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;
use tally_realtime::{CounterEngine, Lifecycle};
use tally_store::StoreManager;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> AppResult<AppConfig> {
    let config_path =
        std::env::var("TALLY_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let env = std::env::var("TALLY_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&config_path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting Tally v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Open the durable store ───────────────────────────
    tracing::info!(provider = %config.store.provider, "Opening counter store");
    let store = StoreManager::new(&config.store, &config.counter.instance).await?;
    let store: Arc<dyn CounterStore> = Arc::new(store);

    // ── Step 2: Build the engine and hydrate in the background ───
    // Requests that arrive before hydration completes wait for it.
    let engine = CounterEngine::new(&config, store);
    let (fatal_tx, fatal_rx) = oneshot::channel::<AppError>();
    let hydrating = engine.clone();
    tokio::spawn(async move {
        if let Err(e) = hydrating.start().await {
            let _ = fatal_tx.send(e);
        }
    });

    // ── Step 3: Router ───────────────────────────────────────────
    let config = Arc::new(config);
    let app = build_router(AppState::new(config.clone(), engine.clone()));

    // ── Step 4: Bind and serve ───────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Tally server listening on {}", addr);

    let closing = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => {
                    tracing::info!("Shutdown signal received, starting graceful shutdown...");
                }
                Ok(e) = fatal_rx => {
                    tracing::error!(error = %e, "Counter failed to start, shutting down");
                }
            }
            // WebSocket tasks end once their connection is closed.
            closing.main().registry().close_all();
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 5: Final flush ──────────────────────────────────────
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    match tokio::time::timeout(grace, engine.shutdown()).await {
        Ok(Ok(report)) => tracing::info!(written = report.written, "Counter state flushed"),
        Ok(Err(e)) => tracing::error!(error = %e, "Final flush failed, recent increments lost"),
        Err(_) => tracing::error!("Final flush did not finish within the grace period"),
    }

    if engine.main().lifecycle() == Lifecycle::Failed {
        return Err(AppError::service_unavailable(
            "Counter could not be hydrated from the store",
        ));
    }

    tracing::info!("Tally server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
