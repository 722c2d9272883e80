// ── Runtime session configuration ──
//
// These types describe *how* a session talks to the relay and how long
// cached knowledge stays trustworthy. They never touch disk: the CLI (or
// any embedding service) builds a `SessionConfig` and hands it in.

use std::time::Duration;

use handylink_api::TransportConfig;

use crate::error::CoreError;

/// Per-class request timeouts.
///
/// Mirrors `handylink_api::TransportConfig` so consumers don't need to
/// depend on the api crate directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTimeouts {
    pub query: Duration,
    pub action: Duration,
    pub server_time: Duration,
    pub setup: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            query: Duration::from_secs(10),
            action: Duration::from_secs(10),
            server_time: Duration::from_secs(5),
            setup: Duration::from_secs(30),
        }
    }
}

/// Configuration for one device session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Relay base URL.
    pub api_url: String,
    pub timeouts: CallTimeouts,
    /// How long a verified mode is trusted before re-querying the device.
    pub mode_cache_ttl: Duration,
    /// Round-trip samples per clock-offset computation.
    pub offset_samples: usize,
    /// How long a computed clock offset stays fresh.
    pub offset_ttl: Duration,
    /// Script-state polling interval while playing.
    pub poll_interval: Duration,
    /// Device-side wait for `/hssp/setup`, in milliseconds.
    pub script_setup_timeout_ms: u64,
    /// Device-side wait for `/hstp/sync`, in milliseconds.
    pub hstp_sync_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: handylink_api::DEFAULT_BASE_URL.to_owned(),
            timeouts: CallTimeouts::default(),
            mode_cache_ttl: Duration::from_secs(30),
            offset_samples: 30,
            offset_ttl: Duration::from_secs(600),
            poll_interval: Duration::from_secs(5),
            script_setup_timeout_ms: 5_000,
            hstp_sync_timeout_ms: 30_000,
        }
    }
}

impl SessionConfig {
    /// Reject values a session cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.offset_samples == 0 {
            return Err(CoreError::validation("offset_samples", "must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::validation("poll_interval", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Translate core timeouts into the api crate's transport config.
pub(crate) fn build_transport(config: &SessionConfig) -> TransportConfig {
    TransportConfig {
        query_timeout: config.timeouts.query,
        action_timeout: config.timeouts.action,
        server_time_timeout: config.timeouts.server_time,
        setup_timeout: config.timeouts.setup,
        ..TransportConfig::default()
    }
}
