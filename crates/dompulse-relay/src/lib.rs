//! DomPulse relay library entry.
//!
//! This crate wires the config, relay coordinator, WebSocket transport, ops
//! endpoints, and in-process probe host into one service. It is consumed by
//! the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod probe_host;
pub mod relay;
pub mod router;
pub mod transport;
