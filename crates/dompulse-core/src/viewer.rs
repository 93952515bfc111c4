//! Viewer-side presentation model.
//!
//! Folds relay events into the two metric readouts and a newest-first log,
//! and formats them for display. No rendering toolkit is involved; a panel
//! only needs to paint the strings produced here.

use std::collections::VecDeque;

use crate::protocol::{ChangeEvent, DocumentId, MetricsSnapshot, ViewerEvent, ViewerRequest};

/// Display cap for the log, matching the relay's per-session bound.
pub const MAX_DISPLAY_LOG: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct ViewerState {
    metrics: Option<MetricsSnapshot>,
    /// Newest first.
    log: VecDeque<ChangeEvent>,
}

impl ViewerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(tab_id: DocumentId) -> ViewerRequest {
        ViewerRequest::Init { tab_id }
    }

    pub fn refresh(tab_id: DocumentId) -> ViewerRequest {
        ViewerRequest::RefreshDom { tab_id }
    }

    pub fn apply(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::InitialData { metrics, log } => {
                self.metrics = Some(metrics);
                self.log.clear();
                self.prepend(log);
            }
            ViewerEvent::MetricsUpdate { metrics } => {
                self.metrics = Some(metrics);
            }
            ViewerEvent::LogUpdate { log } => {
                if let Some(last) = log.last() {
                    self.metrics = Some(last.metrics);
                }
                self.prepend(log);
            }
        }
    }

    // Batches arrive oldest-first; each entry goes on top of the list.
    fn prepend(&mut self, batch: Vec<ChangeEvent>) {
        for entry in batch {
            self.log.push_front(entry);
        }
        self.log.truncate(MAX_DISPLAY_LOG);
    }

    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.metrics
    }

    /// Newest-first entries.
    pub fn entries(&self) -> impl Iterator<Item = &ChangeEvent> {
        self.log.iter()
    }

    /// `(node count, max depth)` readouts; dashes before the first report.
    pub fn readouts(&self) -> (String, String) {
        match self.metrics {
            Some(m) => (group_thousands(m.node_count), m.max_depth.to_string()),
            None => ("-".to_string(), "-".to_string()),
        }
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.log.iter().map(format_entry).collect()
    }
}

pub fn format_entry(e: &ChangeEvent) -> String {
    format!(
        "{} at {} (Nodes: {}, Depth: {})",
        e.kind.as_str(),
        e.target_label,
        e.metrics.node_count,
        e.metrics.max_depth
    )
}

/// `1234567` → `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
