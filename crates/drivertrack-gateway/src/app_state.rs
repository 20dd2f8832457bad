//! Shared application state for the drivertrack gateway.
//!
//! Owns the single `LocationRegistry` instance and the startup-validated
//! authenticator. Cloned cheaply into every handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use drivertrack_core::error::Result;

use crate::auth::Authenticator;
use crate::config::{GatewayConfig, SigningSettings};
use crate::obs::DriverTrackMetrics;
use crate::registry::LocationRegistry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<LocationRegistry>,
    metrics: Arc<DriverTrackMetrics>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    authenticator: Authenticator,
    session_seq: AtomicU64,
    shutdown_tx: watch::Sender<bool>,
}

impl AppState {
    /// Build application state.
    /// Fails if the signing key does not fit the configured algorithm.
    pub fn new(cfg: GatewayConfig, signing: &SigningSettings) -> Result<Self> {
        let authenticator = Authenticator::new(signing, &cfg.auth)?;
        let (shutdown_tx, _) = watch::channel(false);

        tracing::info!(
            algorithm = ?signing.algorithm(),
            role = %authenticator.required_role(),
            bind_subject = cfg.auth.bind_subject,
            "authenticator ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                authenticator,
                session_seq: AtomicU64::new(1),
                shutdown_tx,
            }),
            registry: Arc::new(LocationRegistry::new()),
            metrics: Arc::new(DriverTrackMetrics::default()),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.inner.authenticator
    }

    pub fn registry(&self) -> Arc<LocationRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn metrics(&self) -> Arc<DriverTrackMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn next_session_id(&self) -> u64 {
        self.inner.session_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }

    /// Flip readiness to draining and tell open sessions to close.
    pub fn begin_drain(&self) {
        self.metrics.set_draining();
        self.inner.shutdown_tx.send_replace(true);
    }

    /// Wait until every accepted session has released its registry entry.
    /// Returns false if sessions are still open when `timeout` elapses.
    pub async fn wait_sessions_closed(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.metrics.sessions_active.get(&[]) <= 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.inner.shutdown_tx.subscribe()
    }

    /// Extra gauge lines rendered next to the metrics registry.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![("drivertrack_registry_drivers", self.registry.len() as u64)]
    }
}
