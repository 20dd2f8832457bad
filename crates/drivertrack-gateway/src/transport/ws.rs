//! Driver location WebSocket handler.
//!
//! Responsibilities:
//! - Route `/ws/drivers/{driver_id}?token=...`
//! - Authenticate before the upgrade; refused sessions get a policy-violation
//!   close and never touch the registry
//! - Stream location updates into the registry, one ack per applied update
//! - Lifecycle: ping/pong, optional idle eviction, shutdown drain
//! - Cleanup: a `DriverLease` taken on accept removes the driver on every
//!   exit path, including task cancellation
//!
//! The registry key is the path segment. The token proves the role only,
//! unless `auth.bind_subject` is enabled.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::Instrument;

use drivertrack_core::error::DriverTrackError;
use drivertrack_core::protocol::close::RejectReason;
use drivertrack_core::protocol::location::ack_text;

use crate::app_state::AppState;
use crate::config::MalformedMode;
use crate::obs::DriverTrackMetrics;
use crate::registry::DriverLease;
use crate::transport::codec::{decode, Inbound};

// --------------------
// Query parsing
// --------------------
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

// --------------------
// Session bookkeeping
// --------------------
#[derive(Debug)]
enum CloseCause {
    PeerClosed,
    StreamEnded,
    Transport(String),
    Malformed(String),
    IdleTimeout,
    Shutdown,
}

impl CloseCause {
    fn label(&self) -> &'static str {
        match self {
            CloseCause::PeerClosed => "peer_closed",
            CloseCause::StreamEnded => "stream_ended",
            CloseCause::Transport(_) => "transport_error",
            CloseCause::Malformed(_) => "malformed_payload",
            CloseCause::IdleTimeout => "idle_timeout",
            CloseCause::Shutdown => "shutdown",
        }
    }

    fn error(&self) -> Option<DriverTrackError> {
        match self {
            CloseCause::Transport(e) => Some(DriverTrackError::Transport(e.clone())),
            CloseCause::Malformed(e) => Some(DriverTrackError::MalformedPayload(e.clone())),
            _ => None,
        }
    }
}

/// Accepted session. Fields drop in order, so the registry entry is gone
/// before the active gauge falls.
struct ActiveSession {
    lease: DriverLease,
    _active: ActiveGauge,
}

impl ActiveSession {
    fn open(lease: DriverLease, metrics: Arc<DriverTrackMetrics>) -> Self {
        metrics.sessions_active.inc(&[]);
        Self {
            lease,
            _active: ActiveGauge(metrics),
        }
    }
}

struct ActiveGauge(Arc<DriverTrackMetrics>);

impl Drop for ActiveGauge {
    fn drop(&mut self) {
        self.0.sessions_active.dec(&[]);
    }
}

fn close_frame(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(
    State(app): State<AppState>,
    Path(driver_id): Path<String>,
    Query(q): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let metrics = app.metrics();
    match app.authenticator().authorize(q.token.as_deref(), &driver_id) {
        Ok(_claims) => {
            metrics.ws_upgrades.inc(&[("result", "accepted")]);
            ws.on_upgrade(move |socket| run_session(app, driver_id, socket))
        }
        Err(rejection) => {
            metrics.ws_upgrades.inc(&[("result", "rejected")]);
            metrics.auth_rejections.inc(&[("reason", rejection.reason.label())]);
            let reason = rejection.reason;
            let detail = rejection.detail.clone();
            let err = DriverTrackError::from(rejection);
            tracing::warn!(
                %driver_id,
                reason = reason.as_str(),
                code = err.client_code().as_str(),
                %detail,
                "driver session rejected"
            );
            ws.on_upgrade(move |socket| reject(socket, reason))
        }
    }
}

async fn reject(mut socket: WebSocket, reason: RejectReason) {
    let frame = CloseFrame {
        code: reason.close_code(),
        reason: reason.as_str().into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

// --------------------
// Core session loop
// --------------------
async fn run_session(app: AppState, driver_id: String, socket: WebSocket) {
    let session_id = app.next_session_id();
    let span = tracing::info_span!("driver_session", %driver_id, session_id);

    async move {
        let metrics = app.metrics();
        let session = ActiveSession::open(
            app.registry().lease(&driver_id, session_id),
            Arc::clone(&metrics),
        );
        tracing::info!("driver connected");

        let (mut ws_tx, mut ws_rx) = socket.split();
        let (cause, updates) = stream_updates(&app, &session.lease, &mut ws_tx, &mut ws_rx).await;

        metrics.sessions_closed.inc(&[("cause", cause.label())]);
        // registry entry goes first, then the transport
        drop(session);
        drop(ws_tx);
        drop(ws_rx);

        match cause.error() {
            Some(err) => tracing::info!(
                cause = cause.label(),
                code = err.client_code().as_str(),
                error = %err,
                updates,
                "driver disconnected"
            ),
            None => tracing::info!(cause = cause.label(), updates, "driver disconnected"),
        }
    }
    .instrument(span)
    .await
}

/// Receive loop. Returns why it ended and how many updates were applied.
async fn stream_updates(
    app: &AppState,
    lease: &DriverLease,
    ws_tx: &mut SplitSink<WebSocket, Message>,
    ws_rx: &mut SplitStream<WebSocket>,
) -> (CloseCause, u64) {
    let gw = &app.cfg().gateway;
    let payload = &app.cfg().payload;
    let metrics = app.metrics();
    let driver_id = lease.driver_id();

    let idle_timeout = gw.idle_timeout();
    let mut ping_tick = gw.ping_interval().map(|every| {
        let mut t = tokio::time::interval_at(Instant::now() + every, every);
        t.set_missed_tick_behavior(MissedTickBehavior::Delay);
        t
    });
    let mut shutdown = app.shutdown_rx();

    let mut last_activity = Instant::now();
    let mut updates = 0u64;

    let cause = loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else { break CloseCause::StreamEnded; };
                let msg = match incoming {
                    Ok(msg) => msg,
                    Err(e) => break CloseCause::Transport(e.to_string()),
                };
                last_activity = Instant::now();

                match decode(msg, gw.max_frame_bytes) {
                    Ok(Inbound::Location(update)) => {
                        if payload.validate_bounds && !update.is_within_bounds() {
                            metrics.malformed_payloads.inc(&[("action", "skip_out_of_bounds")]);
                            tracing::warn!(
                                latitude = ?update.latitude,
                                longitude = ?update.longitude,
                                "location outside bounds, skipped"
                            );
                            continue;
                        }

                        lease.update(update.latitude, update.longitude);
                        updates += 1;
                        metrics.location_updates.inc(&[]);
                        tracing::debug!(
                            latitude = ?update.latitude,
                            longitude = ?update.longitude,
                            "location updated"
                        );

                        if let Err(e) = ws_tx.send(Message::Text(ack_text(driver_id))).await {
                            break CloseCause::Transport(e.to_string());
                        }
                    }
                    Ok(Inbound::Ping(data)) => {
                        if let Err(e) = ws_tx.send(Message::Pong(data)).await {
                            break CloseCause::Transport(e.to_string());
                        }
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => break CloseCause::PeerClosed,
                    Err(e) => match payload.on_malformed {
                        MalformedMode::Close => {
                            metrics.malformed_payloads.inc(&[("action", "close")]);
                            let _ = ws_tx.send(close_frame(close_code::INVALID, "Malformed payload")).await;
                            break CloseCause::Malformed(e.to_string());
                        }
                        MalformedMode::Skip => {
                            metrics.malformed_payloads.inc(&[("action", "skip")]);
                            tracing::warn!(error = %e, "malformed payload skipped");
                        }
                    },
                }
            }

            // heartbeat
            _ = next_tick(&mut ping_tick) => {
                if let Err(e) = ws_tx.send(Message::Ping(Vec::new())).await {
                    break CloseCause::Transport(e.to_string());
                }
            }

            // idle eviction
            _ = idle_deadline(last_activity, idle_timeout) => {
                let _ = ws_tx.send(close_frame(close_code::NORMAL, "Idle timeout")).await;
                break CloseCause::IdleTimeout;
            }

            // drain
            _ = wait_for_drain(&mut shutdown) => {
                let _ = ws_tx.send(close_frame(close_code::AWAY, "Server shutting down")).await;
                break CloseCause::Shutdown;
            }
        }
    };

    (cause, updates)
}

async fn next_tick(tick: &mut Option<Interval>) {
    match tick {
        Some(t) => {
            t.tick().await;
        }
        None => pending::<()>().await,
    }
}

/// Resolves once draining starts. The watch guard is released inside, so the
/// session future stays `Send`.
async fn wait_for_drain(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|draining| *draining).await;
}

async fn idle_deadline(last_activity: Instant, idle_timeout: Option<Duration>) {
    match idle_timeout {
        Some(d) => tokio::time::sleep_until(last_activity + d).await,
        None => pending::<()>().await,
    }
}
