//! DomPulse relay.
//!
//! - Probe endpoint: /v1/probe?doc=...
//! - Viewer endpoint: /v1/viewer
//! - Ops: /healthz, /readyz, /metrics
//! - Ctrl-C drains: readiness flips to 503, then the server shuts down

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use dompulse_relay::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = config::config_path();
    let cfg = config::load_from_file(&path).expect("config load failed");
    let listen: SocketAddr = cfg
        .relay
        .listen
        .parse()
        .expect("relay.listen must be a valid SocketAddr");

    let state = app_state::AppState::new(cfg).expect("app state init failed");
    let sweeper = state.spawn_background();
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "dompulse-relay starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested, draining");
            state.set_draining();
        })
        .await
        .expect("server failed");

    if let Some(h) = sweeper {
        h.abort();
    }
}
