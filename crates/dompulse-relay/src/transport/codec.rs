//! Decode-once codec for the transport layer.
//!
//! - Text frames => typed envelope (probe or viewer direction)
//! - Binary frames => rejected; the protocol is JSON only
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use dompulse_core::{
    error::{DomPulseError, Result},
    protocol::{self, ProbeMessage, ViewerRequest},
};

#[derive(Debug)]
pub enum Inbound<T> {
    Frame(T),
    Ping(Vec<u8>),
    Pong,
    Close,
}

/// Cheap length check, done before any parsing.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}

fn decode_with<T>(msg: Message, max_frame_bytes: usize, parse: fn(&str) -> Result<T>) -> Result<Inbound<T>> {
    if frame_len(&msg) > max_frame_bytes {
        return Err(DomPulseError::PayloadTooLarge);
    }
    match msg {
        Message::Text(s) => Ok(Inbound::Frame(parse(&s)?)),
        Message::Binary(_) => Err(DomPulseError::BadRequest("binary frames are not supported".into())),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

pub fn decode_probe(msg: Message, max_frame_bytes: usize) -> Result<Inbound<ProbeMessage>> {
    decode_with(msg, max_frame_bytes, protocol::decode_probe_message)
}

pub fn decode_viewer(msg: Message, max_frame_bytes: usize) -> Result<Inbound<ViewerRequest>> {
    decode_with(msg, max_frame_bytes, protocol::decode_viewer_request)
}
