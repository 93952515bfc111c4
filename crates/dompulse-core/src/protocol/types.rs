//! Value types carried inside envelopes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomPulseError, Result};

/// Opaque identifier of an observed document (browser tab).
///
/// Accepted on the wire as a JSON string or integer and always kept as a
/// string, so `42` and `"42"` address the same session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawDocumentId", into = "String")]
pub struct DocumentId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocumentId {
    Text(String),
    Number(i64),
}

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an id from untrusted input (query string, JSON).
    pub fn parse(raw: &str) -> Result<Self> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(DomPulseError::BadRequest("document id must not be empty".into()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<RawDocumentId> for DocumentId {
    type Error = DomPulseError;

    fn try_from(raw: RawDocumentId) -> Result<Self> {
        match raw {
            RawDocumentId::Text(s) => Self::parse(&s),
            RawDocumentId::Number(n) => Ok(Self(n.to_string())),
        }
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Size/shape metrics of a document at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub node_count: u64,
    pub max_depth: u64,
}

impl MetricsSnapshot {
    pub fn new(node_count: u64, max_depth: u64) -> Self {
        Self { node_count, max_depth }
    }
}

/// Structural change direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "ADDED", alias = "ADD")]
    Added,
    #[serde(rename = "REMOVED", alias = "REMOVE")]
    Removed,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Added => "ADDED",
            ChangeKind::Removed => "REMOVED",
        }
    }
}

/// One recorded structural mutation plus the metrics valid at that moment.
///
/// `mutationType` and `target` are accepted as aliases, and unknown fields
/// are ignored, so payloads from older probes still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    #[serde(alias = "mutationType")]
    pub kind: ChangeKind,
    #[serde(alias = "target")]
    pub target_label: String,
    /// Milliseconds on the probe's monotonic clock.
    pub timestamp: f64,
    pub metrics: MetricsSnapshot,
}
