//! Probe and viewer sockets against the served router.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use dompulse_core::protocol::{
    decode_probe_command, decode_viewer_event, ChangeKind, DocumentId, MetricsSnapshot,
    ProbeCommand, ViewerEvent,
};
use dompulse_relay::app_state::AppState;
use dompulse_relay::config::RelayConfig;
use dompulse_relay::router;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve() -> (AppState, SocketAddr) {
    let state = AppState::new(RelayConfig::default()).unwrap();
    let app = router::build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (state, addr)
}

async fn connect(addr: SocketAddr, path: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{addr}{path}")).await.unwrap();
    ws
}

async fn send(ws: &mut Ws, text: &str) {
    ws.send(Message::Text(text.to_owned().into())).await.unwrap();
}

/// Next text frame; control frames are skipped.
async fn next_text(ws: &mut Ws) -> String {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(t) = msg {
            return t.as_str().to_owned();
        }
    }
}

async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn metrics_flow_round_trip_over_sockets() {
    let (state, addr) = serve().await;
    let c = state.coordinator();
    let id = DocumentId::new("42");

    let mut probe = connect(addr, "/v1/probe?doc=42").await;
    eventually(|| c.has_probe(&id)).await;

    send(
        &mut probe,
        r#"{"action":"UPDATE_METRICS","data":{"nodeCount":120,"maxDepth":4}}"#,
    )
    .await;
    eventually(|| c.sessions().latest_metrics(&id) == Some(MetricsSnapshot::new(120, 4))).await;

    let mut viewer = connect(addr, "/v1/viewer").await;
    send(&mut viewer, r#"{"action":"INIT","tabId":42}"#).await;
    assert_eq!(
        decode_viewer_event(&next_text(&mut viewer).await).unwrap(),
        ViewerEvent::InitialData {
            metrics: MetricsSnapshot::new(120, 4),
            log: vec![],
        }
    );

    send(&mut viewer, r#"{"action":"REFRESH_DOM","tabId":"42"}"#).await;
    assert_eq!(
        decode_probe_command(&next_text(&mut probe).await).unwrap(),
        ProbeCommand::RequestMetrics
    );

    send(
        &mut probe,
        r#"{"action":"LOG_MUTATIONS","data":[{"type":"DOM_MUTATION","mutationType":"ADD","target":"DIV","timestamp":1.5,"metrics":{"nodeCount":121,"maxDepth":4}}]}"#,
    )
    .await;
    let ViewerEvent::LogUpdate { log } = decode_viewer_event(&next_text(&mut viewer).await).unwrap()
    else {
        panic!("expected LOG_UPDATE");
    };
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, ChangeKind::Added);
    assert_eq!(log[0].target_label, "DIV");
    assert_eq!(log[0].metrics, MetricsSnapshot::new(121, 4));

    let _ = viewer.close(None).await;
    eventually(|| c.sessions().subscriber_of(&id).is_none()).await;

    let _ = probe.close(None).await;
    eventually(|| !c.has_probe(&id)).await;
    assert!(c.sessions().contains(&id));
}

#[tokio::test]
async fn malformed_frame_keeps_the_connection() {
    let (state, addr) = serve().await;

    let mut viewer = connect(addr, "/v1/viewer").await;
    send(&mut viewer, "not json").await;
    send(&mut viewer, r#"{"action":"INIT","tabId":"7"}"#).await;

    assert!(matches!(
        decode_viewer_event(&next_text(&mut viewer).await).unwrap(),
        ViewerEvent::InitialData { .. }
    ));
    assert_eq!(
        state
            .metrics()
            .decode_errors
            .get(&[("role", "viewer"), ("code", "BAD_REQUEST")]),
        1
    );
}

#[tokio::test]
async fn upgrade_requires_a_document_id() {
    let (state, addr) = serve().await;

    assert!(connect_async(format!("ws://{addr}/v1/probe?doc=%20")).await.is_err());
    assert!(connect_async(format!("ws://{addr}/v1/probe")).await.is_err());
    assert_eq!(state.coordinator().probe_count(), 0);
}

#[tokio::test]
async fn draining_refuses_upgrades() {
    let (state, addr) = serve().await;
    state.set_draining();

    assert!(connect_async(format!("ws://{addr}/v1/viewer")).await.is_err());
    assert!(connect_async(format!("ws://{addr}/v1/probe?doc=1")).await.is_err());

    let mut tcp = TcpStream::connect(addr).await.unwrap();
    tcp.write_all(b"GET /readyz HTTP/1.1\r\nHost: relay\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut resp = String::new();
    tcp.read_to_string(&mut resp).await.unwrap();
    assert!(resp.starts_with("HTTP/1.1 503"), "got {resp}");
}
