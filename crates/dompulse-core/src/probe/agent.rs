use std::time::Instant;

use crate::probe::dom::{compute_snapshot, Document};
use crate::probe::mutation::MutationRecord;
use crate::protocol::{ChangeEvent, ProbeCommand, ProbeMessage};

/// Monotonic millisecond source for event timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Milliseconds since the probe was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Per-document probe: turns document state and mutation records into
/// outbound probe messages.
#[derive(Debug, Default)]
pub struct Probe<C = MonotonicClock> {
    clock: C,
}

impl Probe {
    pub fn new() -> Self {
        Self {
            clock: MonotonicClock::new(),
        }
    }
}

impl<C: Clock> Probe<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Direct metrics report.
    pub fn report(&self, doc: &Document) -> ProbeMessage {
        ProbeMessage::UpdateMetrics {
            data: compute_snapshot(doc),
        }
    }

    /// One `ChangeEvent` per structural record, each with freshly computed
    /// metrics. Returns `None` when nothing in the batch qualifies.
    pub fn observe(&self, doc: &Document, records: &[MutationRecord]) -> Option<ProbeMessage> {
        let events: Vec<ChangeEvent> = records
            .iter()
            .filter(|r| r.is_structural())
            .map(|r| ChangeEvent {
                kind: r.change_kind(),
                target_label: r.label().to_string(),
                timestamp: self.clock.now_ms(),
                metrics: compute_snapshot(doc),
            })
            .collect();

        if events.is_empty() {
            return None;
        }
        tracing::trace!(events = events.len(), "probe batch");
        Some(ProbeMessage::LogMutations { data: events })
    }

    pub fn handle_command(&self, doc: &Document, cmd: ProbeCommand) -> ProbeMessage {
        match cmd {
            ProbeCommand::RequestMetrics => self.report(doc),
        }
    }
}
