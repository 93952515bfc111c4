//! Relay → viewer / relay → probe frames as a panel would receive them.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde_json::json;

use dompulse_core::protocol::{
    decode_probe_command, decode_viewer_event, encode, ChangeEvent, ChangeKind, DocumentId,
    MetricsSnapshot, ProbeCommand, ViewerEvent, ViewerRequest,
};

#[test]
fn initial_data_shape() {
    let ev = ViewerEvent::InitialData {
        metrics: MetricsSnapshot::new(120, 4),
        log: vec![ChangeEvent {
            kind: ChangeKind::Added,
            target_label: "DIV".into(),
            timestamp: 12.5,
            metrics: MetricsSnapshot::new(120, 4),
        }],
    };
    let v: serde_json::Value = serde_json::from_str(&encode(&ev).unwrap()).unwrap();
    assert_eq!(
        v,
        json!({
            "action": "INITIAL_DATA",
            "metrics": { "nodeCount": 120, "maxDepth": 4 },
            "log": [{
                "kind": "ADDED",
                "targetLabel": "DIV",
                "timestamp": 12.5,
                "metrics": { "nodeCount": 120, "maxDepth": 4 }
            }]
        })
    );
    assert_eq!(decode_viewer_event(&v.to_string()).unwrap(), ev);
}

#[test]
fn request_metrics_has_no_payload() {
    let s = encode(&ProbeCommand::RequestMetrics).unwrap();
    assert_eq!(s, r#"{"action":"REQUEST_METRICS"}"#);
    assert_eq!(decode_probe_command(&s).unwrap(), ProbeCommand::RequestMetrics);
}

#[test]
fn tab_id_is_sent_as_string() {
    let req = ViewerRequest::RefreshDom {
        tab_id: DocumentId::new("17"),
    };
    assert_eq!(encode(&req).unwrap(), r#"{"action":"REFRESH_DOM","tabId":"17"}"#);
}
