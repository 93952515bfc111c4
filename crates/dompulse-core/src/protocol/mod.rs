//! Wire protocol between probes, the relay, and viewers.
//!
//! Every frame is a JSON object tagged by `action`:
//! - probe → relay: `UPDATE_METRICS`, `LOG_MUTATIONS`
//! - relay → probe: `REQUEST_METRICS`
//! - viewer → relay: `INIT`, `REFRESH_DOM`
//! - relay → viewer: `INITIAL_DATA`, `METRICS_UPDATE`, `LOG_UPDATE`
//!
//! All decoders are panic-free: malformed input is reported as
//! `DomPulseError` so the relay stays up under garbage traffic.

pub mod envelope;
pub mod types;

pub use envelope::{
    decode_probe_command, decode_probe_message, decode_viewer_event, decode_viewer_request,
    encode, ProbeCommand, ProbeMessage, ViewerEvent, ViewerRequest,
};
pub use types::{ChangeEvent, ChangeKind, DocumentId, MetricsSnapshot};
