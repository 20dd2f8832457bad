//! drivertrack gateway.
//!
//! - WebSocket endpoint: /ws/drivers/{driver_id}?token=...
//! - Fail-fast startup: SECRET_KEY / ALGORITHM and the YAML config are
//!   validated before the listener binds
//! - Graceful shutdown on Ctrl+C / SIGTERM (sessions drained, registry cleaned)

use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use drivertrack_core::error::{DriverTrackError, Result};
use drivertrack_gateway::{app_state::AppState, config, router};

const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(code = e.client_code().as_str(), error = %e, "drivertrack-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::var("DRIVERTRACK_CONFIG")
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_or_default(&path)?;
    let signing = config::signing_from_env()?;

    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| DriverTrackError::Config(format!("gateway.listen: {e}")))?;

    let state = AppState::new(cfg, &signing)?;
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| DriverTrackError::Internal(format!("failed to bind {listen}: {e}")))?;
    tracing::info!(%listen, "drivertrack-gateway starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|e| DriverTrackError::Internal(format!("server failed: {e}")))?;

    // serve returns once the listener stops; upgraded sockets finish on their own tasks
    if !state.wait_sessions_closed(SESSION_DRAIN_TIMEOUT).await {
        tracing::warn!(
            active = state.metrics().sessions_active.get(&[]),
            "sessions still open after drain timeout"
        );
    }

    tracing::info!(remaining = state.registry().len(), "drivertrack-gateway stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("signal received, starting graceful shutdown");
    state.begin_drain();
}
