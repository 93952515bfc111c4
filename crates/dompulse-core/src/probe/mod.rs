//! In-page metrics probe.
//!
//! The probe measures a [`Document`] (element count, max depth below the
//! content root) and converts batches of [`MutationRecord`]s into
//! `LOG_MUTATIONS` messages. Scheduling (startup report, interval, command
//! handling) belongs to the host that owns the document.

pub mod agent;
pub mod dom;
pub mod mutation;

use std::time::Duration;

pub use agent::{Clock, MonotonicClock, Probe};
pub use dom::{compute_snapshot, Document, Element};
pub use mutation::{MutationKind, MutationRecord, DOCUMENT_LABEL};

/// How often a probe re-reports metrics unprompted.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);
