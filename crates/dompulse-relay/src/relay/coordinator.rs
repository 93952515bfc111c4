use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use dompulse_core::protocol::{DocumentId, ProbeCommand, ProbeMessage, ViewerEvent, ViewerRequest};

use crate::obs::RelayMetrics;
use crate::relay::session_registry::{Delivery, SessionRegistry, Subscriber};

/// Coordinator-side handle of a connected probe.
#[derive(Clone)]
struct ProbeEntry {
    link_id: u64,
    tx: mpsc::Sender<ProbeCommand>,
}

/// Probe-side end of a registration: commands routed to this document.
pub struct ProbeLink {
    pub doc: DocumentId,
    pub link_id: u64,
    pub commands: mpsc::Receiver<ProbeCommand>,
}

/// Routes probe events into sessions and on to subscribers, and subscriber
/// requests back to probes.
pub struct RelayCoordinator {
    sessions: SessionRegistry,
    probes: DashMap<DocumentId, ProbeEntry>,
    next_id: AtomicU64,
    queue: usize,
    metrics: Arc<RelayMetrics>,
}

impl RelayCoordinator {
    pub fn new(max_log: usize, queue: usize, metrics: Arc<RelayMetrics>) -> Self {
        Self {
            sessions: SessionRegistry::new(max_log),
            probes: DashMap::new(),
            next_id: AtomicU64::new(1),
            queue: queue.max(1),
            metrics,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    pub fn has_probe(&self, id: &DocumentId) -> bool {
        self.probes.contains_key(id)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // --------------------
    // Probe side
    // --------------------

    /// Register the command channel for `doc`. A newer registration replaces
    /// the older one, whose command stream then ends.
    pub fn register_probe(&self, doc: DocumentId) -> ProbeLink {
        let (tx, rx) = mpsc::channel(self.queue);
        let link_id = self.next_id();
        if self
            .probes
            .insert(doc.clone(), ProbeEntry { link_id, tx })
            .is_some()
        {
            tracing::debug!(doc = %doc, link_id, "probe link replaced");
        }
        tracing::info!(doc = %doc, link_id, "probe registered");
        ProbeLink {
            doc,
            link_id,
            commands: rx,
        }
    }

    /// Remove a probe link; stale links (already replaced) are ignored.
    pub fn unregister_probe(&self, doc: &DocumentId, link_id: u64) {
        if self
            .probes
            .remove_if(doc, |_, e| e.link_id == link_id)
            .is_some()
        {
            tracing::info!(doc = %doc, link_id, "probe unregistered");
        }
    }

    /// Fold one probe message into its session and forward it.
    pub fn handle_probe(&self, doc: &DocumentId, msg: ProbeMessage) {
        let action = msg.action();
        self.metrics
            .inbound_messages
            .inc(&[("role", "probe"), ("action", action)]);

        let delivery = match msg {
            ProbeMessage::UpdateMetrics { data } => self.sessions.record_metrics(doc, data),
            ProbeMessage::LogMutations { data } => {
                if data.is_empty() {
                    tracing::warn!(doc = %doc, "empty LOG_MUTATIONS discarded");
                    return;
                }
                self.sessions.record_batch(doc, data)
            }
        };
        self.note_delivery(doc, action, delivery);
    }

    // --------------------
    // Subscriber side
    // --------------------

    /// New subscriber endpoint plus the receiver its connection drains.
    pub fn connect_subscriber(&self) -> (Subscriber, mpsc::Receiver<ViewerEvent>) {
        let (tx, rx) = mpsc::channel(self.queue);
        let sub = Subscriber {
            id: self.next_id(),
            tx,
        };
        (sub, rx)
    }

    pub fn handle_viewer(&self, sub: &Subscriber, req: ViewerRequest) {
        self.metrics
            .inbound_messages
            .inc(&[("role", "viewer"), ("action", req.action())]);

        match req {
            ViewerRequest::Init { tab_id } => {
                let delivery = self.sessions.attach_subscriber(&tab_id, sub.clone());
                if delivery == Delivery::Sent {
                    tracing::info!(doc = %tab_id, sub = sub.id, "subscriber attached");
                } else {
                    tracing::warn!(doc = %tab_id, sub = sub.id, outcome = delivery.as_str(), "subscriber not attached");
                }
                self.note_delivery(&tab_id, "INITIAL_DATA", delivery);
            }
            ViewerRequest::RefreshDom { tab_id } => self.request_metrics(&tab_id),
        }
    }

    /// Ask the probe owning `doc` for a fresh report. Best effort: a missing
    /// or unreachable probe makes this a no-op.
    pub fn request_metrics(&self, doc: &DocumentId) {
        let Some(entry) = self.probes.get(doc).map(|e| e.value().clone()) else {
            tracing::debug!(doc = %doc, "refresh: no probe");
            self.metrics.refresh_misses.inc(&[("reason", "no_probe")]);
            return;
        };
        match entry.tx.try_send(ProbeCommand::RequestMetrics) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.metrics.refresh_misses.inc(&[("reason", "queue_full")]);
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.refresh_misses.inc(&[("reason", "closed")]);
                self.unregister_probe(doc, entry.link_id);
            }
        }
    }

    /// Viewer connection went away. Idempotent.
    pub fn disconnect_subscriber(&self, sub: &Subscriber) {
        let n = self.sessions.detach_subscriber(sub.id);
        if n > 0 {
            tracing::info!(sub = sub.id, "subscriber detached");
        }
    }

    fn note_delivery(&self, doc: &DocumentId, action: &str, delivery: Delivery) {
        match delivery {
            Delivery::Sent => {}
            Delivery::NoSubscriber => tracing::trace!(doc = %doc, action, "no subscriber"),
            Delivery::QueueFull | Delivery::Closed => {
                tracing::debug!(doc = %doc, action, outcome = delivery.as_str(), "delivery dropped")
            }
        }
        self.metrics
            .deliveries
            .inc(&[("action", action), ("outcome", delivery.as_str())]);
    }

    // --------------------
    // Lifetime
    // --------------------

    /// Evict idle sessions (see `SessionRegistry::evict_idle`).
    pub fn sweep(&self, ttl: Duration) -> usize {
        let evicted = self.sessions.evict_idle(ttl, |id| self.has_probe(id));
        for id in &evicted {
            tracing::debug!(doc = %id, "session evicted");
        }
        if !evicted.is_empty() {
            self.metrics
                .sessions_evicted
                .add(&[("reason", "idle")], evicted.len() as u64);
        }
        evicted.len()
    }

    /// Periodic sweeper; `None` when eviction is disabled (`ttl == 0`).
    pub fn spawn_sweeper(self: &Arc<Self>, ttl: Duration, every: Duration) -> Option<JoinHandle<()>> {
        if ttl.is_zero() {
            return None;
        }
        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let n = this.sweep(ttl);
                if n > 0 {
                    tracing::info!(evicted = n, remaining = this.sessions.len(), "session sweep");
                }
            }
        }))
    }
}
