//! JSON envelopes, tagged by `action`, for all four directions.
//!
//! Decoding is fail-fast: anything that does not match one of the known
//! shapes is returned as `DomPulseError::BadRequest` so the caller can log
//! and discard it instead of propagating half-filled values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DomPulseError, Result};
use crate::protocol::types::{ChangeEvent, DocumentId, MetricsSnapshot};

/// Probe → relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeMessage {
    /// Direct metrics report (startup, interval, or on request).
    UpdateMetrics { data: MetricsSnapshot },
    /// Batch of change events; never empty once validated.
    LogMutations { data: Vec<ChangeEvent> },
}

impl ProbeMessage {
    pub fn action(&self) -> &'static str {
        match self {
            ProbeMessage::UpdateMetrics { .. } => "UPDATE_METRICS",
            ProbeMessage::LogMutations { .. } => "LOG_MUTATIONS",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ProbeMessage::LogMutations { data } if data.is_empty() => Err(
                DomPulseError::BadRequest("LOG_MUTATIONS requires a non-empty batch".into()),
            ),
            _ => Ok(()),
        }
    }
}

/// Relay → probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeCommand {
    /// Recompute and report metrics now.
    RequestMetrics,
}

/// Viewer → relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewerRequest {
    /// Subscribe to a document's stream.
    Init {
        #[serde(rename = "tabId")]
        tab_id: DocumentId,
    },
    /// Ask the document's probe for a fresh report.
    RefreshDom {
        #[serde(rename = "tabId")]
        tab_id: DocumentId,
    },
}

impl ViewerRequest {
    pub fn action(&self) -> &'static str {
        match self {
            ViewerRequest::Init { .. } => "INIT",
            ViewerRequest::RefreshDom { .. } => "REFRESH_DOM",
        }
    }

    pub fn tab_id(&self) -> &DocumentId {
        match self {
            ViewerRequest::Init { tab_id } | ViewerRequest::RefreshDom { tab_id } => tab_id,
        }
    }
}

/// Relay → viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewerEvent {
    /// Full replay on subscribe, log oldest-first.
    InitialData {
        metrics: MetricsSnapshot,
        log: Vec<ChangeEvent>,
    },
    MetricsUpdate {
        metrics: MetricsSnapshot,
    },
    /// The newly arrived batch only.
    LogUpdate {
        log: Vec<ChangeEvent>,
    },
}

impl ViewerEvent {
    pub fn action(&self) -> &'static str {
        match self {
            ViewerEvent::InitialData { .. } => "INITIAL_DATA",
            ViewerEvent::MetricsUpdate { .. } => "METRICS_UPDATE",
            ViewerEvent::LogUpdate { .. } => "LOG_UPDATE",
        }
    }
}

fn decode<T: DeserializeOwned>(what: &str, s: &str) -> Result<T> {
    serde_json::from_str(s)
        .map_err(|e| DomPulseError::BadRequest(format!("invalid {what} envelope: {e}")))
}

/// Decode and validate a probe frame.
pub fn decode_probe_message(s: &str) -> Result<ProbeMessage> {
    let msg: ProbeMessage = decode("probe", s)?;
    msg.validate()?;
    Ok(msg)
}

pub fn decode_probe_command(s: &str) -> Result<ProbeCommand> {
    decode("probe command", s)
}

pub fn decode_viewer_request(s: &str) -> Result<ViewerRequest> {
    decode("viewer", s)
}

pub fn decode_viewer_event(s: &str) -> Result<ViewerEvent> {
    decode("viewer event", s)
}

/// Serialize any envelope to a text frame.
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg)
        .map_err(|e| DomPulseError::Internal(format!("json encode failed: {e}")))
}
