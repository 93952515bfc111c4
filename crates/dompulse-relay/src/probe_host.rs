//! In-process probe host.
//!
//! Drives a [`Probe`] over a shared [`Document`] the way a page-side script
//! would: a report on startup, a report every `report_every`, one
//! `LOG_MUTATIONS` per mutation batch, and a report whenever the coordinator
//! forwards `REQUEST_METRICS`. Useful for embedding the relay next to an
//! in-process DOM and for exercising the full probe → viewer path in tests.

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use dompulse_core::error::{DomPulseError, Result};
use dompulse_core::probe::{Document, MutationRecord, Probe};
use dompulse_core::protocol::DocumentId;

use crate::relay::{ProbeLink, RelayCoordinator};

/// Handle to a running probe task.
pub struct ProbeHandle {
    doc_id: DocumentId,
    document: Arc<RwLock<Document>>,
    mutations: mpsc::Sender<Vec<MutationRecord>>,
    task: JoinHandle<()>,
}

impl ProbeHandle {
    pub fn doc_id(&self) -> &DocumentId {
        &self.doc_id
    }

    /// Mutate the document; `f` returns the mutation records it produced,
    /// which are then observed by the probe.
    pub async fn mutate<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Document) -> Vec<MutationRecord>,
    {
        let records = {
            let mut doc = self.document.write().await;
            f(&mut doc)
        };
        if records.is_empty() {
            return Ok(());
        }
        self.mutations
            .send(records)
            .await
            .map_err(|_| DomPulseError::Internal("probe task stopped".into()))
    }

    /// Stop the probe and release its link.
    pub async fn shutdown(self) {
        drop(self.mutations);
        let _ = self.task.await;
    }
}

pub fn spawn(
    coordinator: Arc<RelayCoordinator>,
    doc_id: DocumentId,
    document: Document,
    report_every: Duration,
) -> ProbeHandle {
    let document = Arc::new(RwLock::new(document));
    let (tx, rx) = mpsc::channel(64);
    // Register before returning so a REFRESH_DOM right after spawn is routed.
    let link = coordinator.register_probe(doc_id.clone());

    let task = tokio::spawn(run(
        coordinator,
        Arc::clone(&document),
        link,
        rx,
        report_every,
    ));

    ProbeHandle {
        doc_id,
        document,
        mutations: tx,
        task,
    }
}

async fn run(
    coordinator: Arc<RelayCoordinator>,
    document: Arc<RwLock<Document>>,
    mut link: ProbeLink,
    mut mutations: mpsc::Receiver<Vec<MutationRecord>>,
    report_every: Duration,
) {
    let probe = Probe::new();
    let doc_id = link.doc.clone();

    let report = probe.report(&*document.read().await);
    coordinator.handle_probe(&doc_id, report);

    let mut tick = tokio::time::interval_at(Instant::now() + report_every, report_every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let msg = probe.report(&*document.read().await);
                coordinator.handle_probe(&doc_id, msg);
            }

            batch = mutations.recv() => {
                let Some(records) = batch else { break; };
                let msg = probe.observe(&*document.read().await, &records);
                if let Some(msg) = msg {
                    coordinator.handle_probe(&doc_id, msg);
                }
            }

            cmd = link.commands.recv() => {
                let Some(cmd) = cmd else {
                    tracing::debug!(doc = %doc_id, "probe link superseded");
                    break;
                };
                let msg = probe.handle_command(&*document.read().await, cmd);
                coordinator.handle_probe(&doc_id, msg);
            }
        }
    }

    coordinator.unregister_probe(&doc_id, link.link_id);
}
