//! DomPulse core.
//!
//! - `protocol`: the JSON envelopes that travel between page probe, relay and
//!   viewer panel, keyed by `action`
//! - `probe`: element-tree model, node-count/depth snapshots, and conversion
//!   of mutation records into change events
//! - `viewer`: the panel's display state (readouts and a capped change log)
//!
//! Malformed input surfaces as [`DomPulseError`]; `unwrap`, `expect` and
//! `panic!` are denied crate-wide.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod probe;
pub mod protocol;
pub mod viewer;

pub use error::{DomPulseError, Result};
