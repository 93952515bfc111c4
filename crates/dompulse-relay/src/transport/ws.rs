//! WebSocket handlers for probes and viewers.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS (`/v1/probe?doc=...`, `/v1/viewer`)
//! - Register the connection with the coordinator (probe link / subscriber)
//! - Lifecycle: ping + idle timeout, size limit before decode
//! - Decode-once, then hand typed envelopes to the coordinator
//!
//! Malformed frames are logged, counted, and discarded; the connection stays up.

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::Instrument;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use dompulse_core::error::{DomPulseError, Result};
use dompulse_core::protocol::{encode, DocumentId, ViewerEvent};

use crate::app_state::AppState;
use crate::obs::RelayMetrics;
use crate::relay::{ProbeLink, Subscriber};
use crate::transport::codec::{decode_probe, decode_viewer, Inbound};

const IDLE_CHECK_EVERY: Duration = Duration::from_millis(250);

#[derive(Debug, Deserialize)]
pub struct ProbeQuery {
    pub doc: String,
}

fn reject(metrics: &RelayMetrics, role: &str, e: &DomPulseError) {
    tracing::warn!(error = %e, role, "frame discarded");
    metrics
        .decode_errors
        .inc(&[("role", role), ("code", e.client_code().as_str())]);
}

// --------------------
// Entry
// --------------------
pub async fn probe_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<ProbeQuery>,
) -> Response {
    if app.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response();
    }
    let doc = match DocumentId::parse(&q.doc) {
        Ok(doc) => doc,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    app.metrics().ws_upgrades.inc(&[("role", "probe")]);

    let span = tracing::info_span!("probe", doc = %doc);
    ws.on_upgrade(move |socket| {
        async move {
            if let Err(e) = run_probe(app, doc, socket).await {
                tracing::debug!(error = %e, "probe connection ended with error");
            }
        }
        .instrument(span)
    })
}

pub async fn viewer_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if app.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response();
    }
    app.metrics().ws_upgrades.inc(&[("role", "viewer")]);

    ws.on_upgrade(move |socket| async move {
        let (sub, events) = app.coordinator().connect_subscriber();
        let span = tracing::info_span!("viewer", sub = sub.id);
        if let Err(e) = run_viewer(app, sub, events, socket).instrument(span).await {
            tracing::debug!(error = %e, "viewer connection ended with error");
        }
    })
}

// --------------------
// Probe connection
// --------------------
async fn run_probe(app: AppState, doc: DocumentId, socket: WebSocket) -> Result<()> {
    let coordinator = app.coordinator();
    let metrics = app.metrics();

    let mut link = coordinator.register_probe(doc.clone());
    metrics.ws_active_connections.inc(&[("role", "probe")]);

    let res = probe_loop(&app, &doc, &mut link, socket).await;

    coordinator.unregister_probe(&doc, link.link_id);
    metrics.ws_active_connections.dec(&[("role", "probe")]);
    res
}

async fn probe_loop(app: &AppState, doc: &DocumentId, link: &mut ProbeLink, socket: WebSocket) -> Result<()> {
    let cfg = &app.cfg().relay;
    let coordinator = app.coordinator();
    let metrics = app.metrics();

    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut ping_tick = tokio::time::interval(Duration::from_millis(cfg.ping_interval_ms));
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut idle_tick = tokio::time::interval(IDLE_CHECK_EVERY);
    let idle_timeout = Duration::from_millis(cfg.idle_timeout_ms);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // relay -> probe commands
            cmd = link.commands.recv() => {
                let Some(cmd) = cmd else {
                    tracing::info!("probe link superseded by a newer connection");
                    break;
                };
                if ws_tx.send(Message::Text(encode(&cmd)?)).await.is_err() {
                    break;
                }
            }

            // probe -> relay
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                match decode_probe(msg, cfg.max_frame_bytes) {
                    Ok(Inbound::Frame(m)) => {
                        let started = std::time::Instant::now();
                        coordinator.handle_probe(doc, m);
                        metrics.handle_duration.observe(&[("role", "probe")], started.elapsed());
                    }
                    Ok(Inbound::Ping(p)) => {
                        if ws_tx.send(Message::Pong(p)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => reject(&metrics, "probe", &e),
                }
            }

            _ = ping_tick.tick() => {
                if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            _ = idle_tick.tick() => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::info!("probe idle timeout");
                    break;
                }
            }
        }
    }

    let _ = ws_tx.close().await;
    Ok(())
}

// --------------------
// Viewer connection
// --------------------
async fn run_viewer(
    app: AppState,
    sub: Subscriber,
    mut events: mpsc::Receiver<ViewerEvent>,
    socket: WebSocket,
) -> Result<()> {
    let coordinator = app.coordinator();
    let metrics = app.metrics();
    metrics.ws_active_connections.inc(&[("role", "viewer")]);

    let res = viewer_loop(&app, &sub, &mut events, socket).await;

    coordinator.disconnect_subscriber(&sub);
    metrics.ws_active_connections.dec(&[("role", "viewer")]);
    res
}

async fn viewer_loop(
    app: &AppState,
    sub: &Subscriber,
    events: &mut mpsc::Receiver<ViewerEvent>,
    socket: WebSocket,
) -> Result<()> {
    let cfg = &app.cfg().relay;
    let coordinator = app.coordinator();
    let metrics = app.metrics();

    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut ping_tick = tokio::time::interval(Duration::from_millis(cfg.ping_interval_ms));
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut idle_tick = tokio::time::interval(IDLE_CHECK_EVERY);
    let idle_timeout = Duration::from_millis(cfg.idle_timeout_ms);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // relay -> viewer
            ev = events.recv() => {
                let Some(ev) = ev else { break; };
                if ws_tx.send(Message::Text(encode(&ev)?)).await.is_err() {
                    break;
                }
            }

            // viewer -> relay
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                match decode_viewer(msg, cfg.max_frame_bytes) {
                    Ok(Inbound::Frame(req)) => {
                        let started = std::time::Instant::now();
                        coordinator.handle_viewer(sub, req);
                        metrics.handle_duration.observe(&[("role", "viewer")], started.elapsed());
                    }
                    Ok(Inbound::Ping(p)) => {
                        if ws_tx.send(Message::Pong(p)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => reject(&metrics, "viewer", &e),
                }
            }

            _ = ping_tick.tick() => {
                if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            _ = idle_tick.tick() => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::info!("viewer idle timeout");
                    break;
                }
            }
        }
    }

    let _ = ws_tx.close().await;
    Ok(())
}
