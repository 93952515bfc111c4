//! Relay core: per-document sessions, bounded logs, and routing between
//! probes and subscribers.

mod coordinator;
mod session_log;
mod session_registry;

pub use coordinator::{ProbeLink, RelayCoordinator};
pub use session_log::{SessionLog, MAX_LOG};
pub use session_registry::{Delivery, Session, SessionRegistry, Subscriber, SubscriberId};
