//! Top-level facade crate for DomPulse.
//!
//! Re-exports core types and the relay library so users can depend on a single crate.

pub mod core {
    pub use dompulse_core::*;
}

pub mod relay {
    pub use dompulse_relay::*;
}
