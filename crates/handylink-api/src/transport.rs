// Shared transport configuration for building the reqwest::Client.
//
// Every vendor call is tagged with a `CallClass`; the class decides the
// per-request timeout so no call can hang on the relay.

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::Error;

/// Timeout class of a vendor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    /// Read-only state queries (`/info`, `/mode`, `/hssp/state`, ...).
    Query,
    /// Physical actions and setting changes (`/hamp/start`, `/slide`, ...).
    Action,
    /// `/servertime` samples used for clock-offset estimation.
    ServerTime,
    /// Calls where the device itself waits (`/hssp/setup`, `/hstp/sync`).
    Setup,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub query_timeout: Duration,
    pub action_timeout: Duration,
    pub server_time_timeout: Duration,
    pub setup_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(10),
            action_timeout: Duration::from_secs(10),
            server_time_timeout: Duration::from_secs(5),
            setup_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl TransportConfig {
    /// The request timeout applied to calls of the given class.
    pub fn timeout_for(&self, class: CallClass) -> Duration {
        match class {
            CallClass::Query => self.query_timeout,
            CallClass::Action => self.action_timeout,
            CallClass::ServerTime => self.server_time_timeout,
            CallClass::Setup => self.setup_timeout,
        }
    }

    /// Build a `reqwest::Client` with additional default headers.
    ///
    /// Used to inject the `X-Connection-Key` header on every call.
    pub fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(concat!("handylink/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(Error::Transport)
    }
}
