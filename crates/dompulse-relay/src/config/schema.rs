use serde::Deserialize;
use dompulse_core::error::{DomPulseError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    pub version: u32,

    #[serde(default)]
    pub relay: RelaySection,

    #[serde(default)]
    pub sessions: SessionsSection,

    #[serde(default)]
    pub probe: ProbeSection,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            relay: RelaySection::default(),
            sessions: SessionsSection::default(),
            probe: ProbeSection::default(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(DomPulseError::UnsupportedVersion);
        }

        self.relay.validate()?;
        self.sessions.validate()?;
        self.probe.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Inbound frames above this size are discarded.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Per-connection outbound queue depth.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl RelaySection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(DomPulseError::BadRequest(
                "relay.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(DomPulseError::BadRequest(
                "relay.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(DomPulseError::BadRequest(
                "relay.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(1024..=4 * 1024 * 1024).contains(&self.max_frame_bytes) {
            return Err(DomPulseError::BadRequest(
                "relay.max_frame_bytes must be between 1024 and 4194304".into(),
            ));
        }
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(DomPulseError::BadRequest(
                "relay.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "127.0.0.1:8787".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_max_frame_bytes() -> usize {
    256 * 1024
}
fn default_outbound_queue() -> usize {
    1024
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsSection {
    /// Rolling log bound per session.
    #[serde(default = "default_max_log")]
    pub max_log: usize,

    /// Evict detached, probe-less sessions idle this long. 0 keeps them forever.
    #[serde(default = "default_idle_ttl_ms")]
    pub idle_ttl_ms: u64,

    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            max_log: default_max_log(),
            idle_ttl_ms: default_idle_ttl_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl SessionsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=10000).contains(&self.max_log) {
            return Err(DomPulseError::BadRequest(
                "sessions.max_log must be between 1 and 10000".into(),
            ));
        }
        if self.idle_ttl_ms != 0 && self.idle_ttl_ms < 1000 {
            return Err(DomPulseError::BadRequest(
                "sessions.idle_ttl_ms must be 0 (disabled) or at least 1000".into(),
            ));
        }
        if !(1000..=3600000).contains(&self.sweep_interval_ms) {
            return Err(DomPulseError::BadRequest(
                "sessions.sweep_interval_ms must be between 1000 and 3600000".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_log() -> usize {
    50
}
fn default_idle_ttl_ms() -> u64 {
    600000
}
fn default_sweep_interval_ms() -> u64 {
    30000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeSection {
    /// Unprompted re-report period for in-process probes.
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            report_interval_ms: default_report_interval_ms(),
        }
    }
}

impl ProbeSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=600000).contains(&self.report_interval_ms) {
            return Err(DomPulseError::BadRequest(
                "probe.report_interval_ms must be between 100 and 600000".into(),
            ));
        }
        Ok(())
    }
}

fn default_report_interval_ms() -> u64 {
    5000
}
