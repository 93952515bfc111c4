//! Transport layer (WebSocket).
//!
//! Exposes the probe/viewer upgrade handlers and the codec that decodes
//! frames once before they reach the coordinator.

pub mod codec;
pub mod ws;
