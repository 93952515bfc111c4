#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use dompulse_core::protocol::{DocumentId, MetricsSnapshot, ProbeMessage, ViewerRequest};
use dompulse_relay::app_state::AppState;
use dompulse_relay::config::{self, RelayConfig};

#[test]
fn invalid_config_is_rejected() {
    let mut cfg = RelayConfig::default();
    cfg.sessions.max_log = 0;
    assert!(AppState::new(cfg).is_err());
}

#[test]
fn coordinator_uses_configured_log_capacity() {
    let cfg = config::load_from_str("version: 1\nsessions:\n  max_log: 2\n").unwrap();
    let state = AppState::new(cfg).unwrap();
    let c = state.coordinator();
    let doc = DocumentId::new("a");

    for n in 0..5 {
        c.handle_probe(
            &doc,
            ProbeMessage::LogMutations {
                data: vec![dompulse_core::protocol::ChangeEvent {
                    kind: dompulse_core::protocol::ChangeKind::Added,
                    target_label: "BODY".into(),
                    timestamp: n as f64,
                    metrics: MetricsSnapshot::new(n, 1),
                }],
            },
        );
    }
    assert_eq!(c.sessions().log(&doc).unwrap().len(), 2);
}

#[tokio::test]
async fn metrics_report_live_gauges() {
    let state = AppState::new(RelayConfig::default()).unwrap();
    let c = state.coordinator();
    c.handle_probe(
        &DocumentId::new("a"),
        ProbeMessage::UpdateMetrics {
            data: MetricsSnapshot::new(1, 1),
        },
    );
    let _link = c.register_probe(DocumentId::new("b"));
    let (sub, _rx) = c.connect_subscriber();
    c.handle_viewer(
        &sub,
        ViewerRequest::Init {
            tab_id: DocumentId::new("a"),
        },
    );

    let out = state.metrics().render(&state.metrics_extra());
    assert!(out.contains("dompulse_sessions 1"));
    assert!(out.contains("dompulse_sessions_subscribed 1"));
    assert!(out.contains("dompulse_probes_connected 1"));
    assert!(out.contains("dompulse_draining 0"));

    state.set_draining();
    assert!(state.is_draining());
    let out = state.metrics().render(&state.metrics_extra());
    assert!(out.contains("dompulse_draining 1"));
}

#[tokio::test]
async fn sweeper_respects_disabled_ttl() {
    let cfg = config::load_from_str("version: 1\nsessions:\n  idle_ttl_ms: 0\n").unwrap();
    let state = AppState::new(cfg).unwrap();
    assert!(state.spawn_background().is_none());

    let state = AppState::new(RelayConfig::default()).unwrap();
    let handle = state.spawn_background().expect("sweeper enabled by default");
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn hosted_probe_reports_on_configured_interval() {
    use dompulse_core::probe::{Document, Element};
    use dompulse_core::protocol::ViewerEvent;
    use tokio::time::{Duration, Instant};

    let cfg = config::load_from_str("version: 1\nprobe:\n  report_interval_ms: 250\n").unwrap();
    let state = AppState::new(cfg).unwrap();
    let c = state.coordinator();
    let (sub, mut rx) = c.connect_subscriber();
    c.handle_viewer(
        &sub,
        ViewerRequest::Init {
            tab_id: DocumentId::new("tab"),
        },
    );
    assert!(matches!(rx.recv().await, Some(ViewerEvent::InitialData { .. })));

    let handle = state.spawn_probe(
        DocumentId::new("tab"),
        Document::with_body(Element::new("body")),
    );
    assert!(matches!(rx.recv().await, Some(ViewerEvent::MetricsUpdate { .. })));

    let start = Instant::now();
    assert!(matches!(rx.recv().await, Some(ViewerEvent::MetricsUpdate { .. })));
    assert!(start.elapsed() >= Duration::from_millis(250));

    handle.shutdown().await;
}
