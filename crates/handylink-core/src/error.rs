// ── Core error types ──
//
// Session-level errors from handylink-core. Consumers never see reqwest
// errors or raw JSON failures; the `From<handylink_api::Error>` impl
// translates transport-layer errors into the domain taxonomy.

use thiserror::Error;

use crate::model::ModeState;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Device reachability ──────────────────────────────────────────
    #[error("Device not reachable: {message}")]
    Connectivity { message: String },

    #[error("Pairing failed: {reason}")]
    Pairing { reason: String },

    #[error("Firmware {version} is too old for this protocol; update the device")]
    FirmwareIncompatible { version: String },

    #[error("No device paired with this session")]
    NotPaired,

    // ── Orchestration errors ─────────────────────────────────────────
    #[error("Mode transition {from} -> {to} failed: {source}")]
    ModeTransition {
        from: ModeState,
        to: ModeState,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Clock sync aborted at sample {sample}/{total}: {source}")]
    ClockSync {
        sample: usize,
        total: usize,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Unknown command: {kind}")]
    UnknownCommand { kind: String },

    #[error("Unknown pattern: {name}")]
    UnknownPattern { name: String },

    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    // ── Vendor errors (wrapped, not exposed raw) ─────────────────────
    #[error("{endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("Vendor rejected request (HTTP {status}): {message}")]
    Vendor {
        status: u16,
        /// Vendor error code from the in-band error object, if any.
        code: Option<i64>,
        message: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if a vendor call expired. The device may or may not
    /// have acted, so replaying is the caller's decision.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::ModeTransition { source, .. } | Self::ClockSync { source, .. } => {
                source.is_timeout()
            }
            _ => false,
        }
    }

    /// Returns `true` if the vendor explicitly refused the request.
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::Vendor { .. } => true,
            Self::ModeTransition { source, .. } | Self::ClockSync { source, .. } => {
                source.is_rejection()
            }
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<handylink_api::Error> for CoreError {
    fn from(err: handylink_api::Error) -> Self {
        match err {
            handylink_api::Error::InvalidConnectionKey { message } => {
                CoreError::Pairing { reason: message }
            }
            handylink_api::Error::Timeout {
                endpoint,
                timeout_ms,
            } => CoreError::Timeout {
                endpoint,
                timeout_ms,
            },
            ref e if e.is_unreachable() => CoreError::Connectivity {
                message: e.to_string(),
            },
            handylink_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout {
                        endpoint: e.url().map(|u| u.path().to_owned()).unwrap_or_default(),
                        timeout_ms: 0,
                    }
                } else if e.is_request() {
                    CoreError::Connectivity {
                        message: e.to_string(),
                    }
                } else {
                    CoreError::Vendor {
                        status: e.status().map_or(0, |s| s.as_u16()),
                        code: None,
                        message: e.to_string(),
                    }
                }
            }
            handylink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            handylink_api::Error::Vendor {
                status,
                code,
                name: _,
                message,
            } => CoreError::Vendor {
                status,
                code,
                message,
            },
            handylink_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
