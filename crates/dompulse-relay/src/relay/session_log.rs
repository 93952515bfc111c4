use std::collections::VecDeque;

use dompulse_core::protocol::ChangeEvent;

/// Default rolling log bound.
pub const MAX_LOG: usize = 50;

/// Bounded, oldest-first rolling log. Appends past the bound evict from the
/// front, so the log is always the newest `capacity` events of the history.
#[derive(Debug, Clone)]
pub struct SessionLog {
    entries: VecDeque<ChangeEvent>,
    capacity: usize,
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new(MAX_LOG)
    }
}

impl SessionLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, batch: &[ChangeEvent]) {
        // Only the tail of an oversized batch can survive.
        let keep = &batch[batch.len().saturating_sub(self.capacity)..];
        let overflow = (self.entries.len() + keep.len()).saturating_sub(self.capacity);
        self.entries.drain(..overflow);
        self.entries.extend(keep.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeEvent> {
        self.entries.iter()
    }

    /// Oldest-first copy for replay.
    pub fn to_vec(&self) -> Vec<ChangeEvent> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dompulse_core::protocol::{ChangeKind, MetricsSnapshot};

    fn ev(i: u64) -> ChangeEvent {
        ChangeEvent {
            kind: ChangeKind::Added,
            target_label: format!("N{i}"),
            timestamp: i as f64,
            metrics: MetricsSnapshot::new(i, 1),
        }
    }

    fn stamps(log: &SessionLog) -> Vec<u64> {
        log.iter().map(|e| e.timestamp as u64).collect()
    }

    #[test]
    fn full_log_plus_three_keeps_newest_fifty() {
        let mut log = SessionLog::default();
        let old: Vec<_> = (0..50).map(ev).collect();
        log.append(&old);
        log.append(&[ev(50), ev(51), ev(52)]);

        assert_eq!(log.len(), 50);
        assert_eq!(stamps(&log), (3..53).collect::<Vec<_>>());
    }

    #[test]
    fn log_is_suffix_of_history_for_any_batching() {
        // batch sizes cycle through 0..=7 plus one oversized batch
        let mut history = Vec::new();
        let mut log = SessionLog::new(50);
        let mut next = 0u64;
        for round in 0..40u64 {
            let size = if round == 17 { 120 } else { round % 8 };
            let batch: Vec<_> = (next..next + size).map(ev).collect();
            next += size;
            history.extend(batch.iter().cloned());
            log.append(&batch);

            assert!(log.len() <= 50);
            let expect_len = history.len().min(50);
            assert_eq!(log.to_vec(), history[history.len() - expect_len..].to_vec());
        }
    }

    #[test]
    fn oversized_batch_keeps_its_tail() {
        let mut log = SessionLog::new(3);
        log.append(&[ev(1)]);
        log.append(&(10..20).map(ev).collect::<Vec<_>>());
        assert_eq!(stamps(&log), vec![17, 18, 19]);
    }
}
