use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Duration, Instant};

use dompulse_core::protocol::{ChangeEvent, DocumentId, MetricsSnapshot, ViewerEvent};

use crate::relay::session_log::SessionLog;

pub type SubscriberId = u64;

/// One viewer connection's outbound queue sender.
#[derive(Clone, Debug)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub tx: mpsc::Sender<ViewerEvent>,
}

/// Result of handing one event to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    NoSubscriber,
    QueueFull,
    Closed,
}

impl Delivery {
    pub fn as_str(self) -> &'static str {
        match self {
            Delivery::Sent => "sent",
            Delivery::NoSubscriber => "no_subscriber",
            Delivery::QueueFull => "queue_full",
            Delivery::Closed => "closed",
        }
    }
}

/// Coordinator state for one observed document.
#[derive(Debug)]
pub struct Session {
    pub id: DocumentId,
    pub subscriber: Option<Subscriber>,
    pub latest_metrics: MetricsSnapshot,
    pub log: SessionLog,
    pub last_activity: Instant,
}

impl Session {
    fn new(id: DocumentId, max_log: usize) -> Self {
        Self {
            id,
            subscriber: None,
            latest_metrics: MetricsSnapshot::default(),
            log: SessionLog::new(max_log),
            last_activity: Instant::now(),
        }
    }

    fn is_subscribed_by(&self, sub: SubscriberId) -> bool {
        self.subscriber.as_ref().map(|s| s.id) == Some(sub)
    }

    // Non-blocking; a closed queue also clears the stale reference.
    fn deliver(&mut self, ev: ViewerEvent) -> Delivery {
        let Some(sub) = self.subscriber.as_ref() else {
            return Delivery::NoSubscriber;
        };
        match sub.tx.try_send(ev) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => Delivery::QueueFull,
            Err(TrySendError::Closed(_)) => {
                self.subscriber = None;
                Delivery::Closed
            }
        }
    }
}

/// Session registry: `document id -> Session`.
///
/// Every operation on one session runs under that entry's shard lock and
/// never awaits, so state changes and the resulting sends are atomic per
/// session.
pub struct SessionRegistry {
    sessions: DashMap<DocumentId, Session>,
    max_log: usize,
}

impl SessionRegistry {
    pub fn new(max_log: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_log,
        }
    }

    pub fn get_or_create(&self, id: &DocumentId) -> RefMut<'_, DocumentId, Session> {
        self.sessions
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::debug!(doc = %id, "session created");
                Session::new(id.clone(), self.max_log)
            })
    }

    /// Direct metrics report: replace the snapshot and forward it.
    pub fn record_metrics(&self, id: &DocumentId, snapshot: MetricsSnapshot) -> Delivery {
        let mut s = self.get_or_create(id);
        s.latest_metrics = snapshot;
        s.last_activity = Instant::now();
        s.deliver(ViewerEvent::MetricsUpdate { metrics: snapshot })
    }

    /// Append a batch, take metrics from its last event, forward the batch only.
    pub fn record_batch(&self, id: &DocumentId, batch: Vec<ChangeEvent>) -> Delivery {
        let Some(latest) = batch.last().map(|e| e.metrics) else {
            return Delivery::NoSubscriber;
        };
        let mut s = self.get_or_create(id);
        s.latest_metrics = latest;
        s.log.append(&batch);
        s.last_activity = Instant::now();
        s.deliver(ViewerEvent::LogUpdate { log: batch })
    }

    /// Attach `sub` to `id` and replay the session to it.
    ///
    /// The subscriber is first detached from any other session. A queue slot
    /// for the replay is reserved before the reference is set, all under the
    /// entry lock: either `sub` is attached and `INITIAL_DATA` is the first
    /// thing it sees for this session, or the session is left as it was.
    pub fn attach_subscriber(&self, id: &DocumentId, sub: Subscriber) -> Delivery {
        for mut other in self.sessions.iter_mut() {
            if other.id != *id && other.is_subscribed_by(sub.id) {
                other.subscriber = None;
                other.last_activity = Instant::now();
            }
        }

        let mut s = self.get_or_create(id);
        let tx = sub.tx.clone();
        let permit = match tx.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Full(())) => return Delivery::QueueFull,
            Err(TrySendError::Closed(())) => return Delivery::Closed,
        };

        if let Some(prev) = s.subscriber.replace(sub) {
            tracing::debug!(doc = %id, prev = prev.id, "subscriber replaced");
        }
        s.last_activity = Instant::now();
        permit.send(ViewerEvent::InitialData {
            metrics: s.latest_metrics,
            log: s.log.to_vec(),
        });
        Delivery::Sent
    }

    /// Clear `sub` from every session it is attached to. Idempotent; returns
    /// how many sessions were detached.
    pub fn detach_subscriber(&self, sub: SubscriberId) -> usize {
        let mut n = 0;
        for mut s in self.sessions.iter_mut() {
            if s.is_subscribed_by(sub) {
                s.subscriber = None;
                s.last_activity = Instant::now();
                n += 1;
            }
        }
        n
    }

    /// Drop sessions with no subscriber, no live probe, and no activity
    /// within `ttl`. Returns the evicted ids.
    pub fn evict_idle(
        &self,
        ttl: Duration,
        has_probe: impl Fn(&DocumentId) -> bool,
    ) -> Vec<DocumentId> {
        let now = Instant::now();
        let mut evicted = Vec::new();
        self.sessions.retain(|id, s| {
            let idle = s.subscriber.is_none()
                && now.duration_since(s.last_activity) >= ttl
                && !has_probe(id);
            if idle {
                evicted.push(id.clone());
            }
            !idle
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn latest_metrics(&self, id: &DocumentId) -> Option<MetricsSnapshot> {
        self.sessions.get(id).map(|s| s.latest_metrics)
    }

    pub fn log(&self, id: &DocumentId) -> Option<Vec<ChangeEvent>> {
        self.sessions.get(id).map(|s| s.log.to_vec())
    }

    pub fn subscriber_of(&self, id: &DocumentId) -> Option<SubscriberId> {
        self.sessions
            .get(id)
            .and_then(|s| s.subscriber.as_ref().map(|sub| sub.id))
    }

    pub fn subscribed_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.subscriber.is_some())
            .count()
    }
}
