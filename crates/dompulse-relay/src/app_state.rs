//! Shared application state for the DomPulse relay.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Duration;

use dompulse_core::error::Result;
use dompulse_core::probe::Document;
use dompulse_core::protocol::DocumentId;

use crate::config::RelayConfig;
use crate::obs::RelayMetrics;
use crate::probe_host::{self, ProbeHandle};
use crate::relay::RelayCoordinator;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    coordinator: Arc<RelayCoordinator>,
    metrics: Arc<RelayMetrics>,
}

struct AppStateInner {
    cfg: RelayConfig,
}

impl AppState {
    /// Build application state from a config. Validates again so states
    /// built in code get the same guarantees as loaded ones.
    pub fn new(cfg: RelayConfig) -> Result<Self> {
        cfg.validate()?;

        let metrics = Arc::new(RelayMetrics::default());
        let coordinator = Arc::new(RelayCoordinator::new(
            cfg.sessions.max_log,
            cfg.relay.outbound_queue,
            Arc::clone(&metrics),
        ));

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg }),
            coordinator,
            metrics,
        })
    }

    pub fn cfg(&self) -> &RelayConfig {
        &self.inner.cfg
    }

    pub fn coordinator(&self) -> Arc<RelayCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }

    pub fn set_draining(&self) {
        self.metrics.set_draining();
    }

    /// Point-in-time gauges rendered alongside the registered families.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        let sessions = self.coordinator.sessions();
        vec![
            ("dompulse_sessions", sessions.len() as u64),
            ("dompulse_sessions_subscribed", sessions.subscribed_count() as u64),
            ("dompulse_probes_connected", self.coordinator.probe_count() as u64),
        ]
    }

    /// Start the idle-session sweeper if eviction is enabled.
    pub fn spawn_background(&self) -> Option<JoinHandle<()>> {
        let s = &self.cfg().sessions;
        self.coordinator.spawn_sweeper(
            Duration::from_millis(s.idle_ttl_ms),
            Duration::from_millis(s.sweep_interval_ms),
        )
    }

    /// Host an in-process probe for `doc_id`, reporting on the configured
    /// interval.
    pub fn spawn_probe(&self, doc_id: DocumentId, document: Document) -> ProbeHandle {
        probe_host::spawn(
            self.coordinator(),
            doc_id,
            document,
            Duration::from_millis(self.cfg().probe.report_interval_ms),
        )
    }
}
