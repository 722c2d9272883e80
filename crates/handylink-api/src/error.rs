use thiserror::Error;

/// Top-level error type for the `handylink-api` crate.
///
/// Keeps timeouts and vendor rejections apart so callers can decide
/// whether replaying a physical-actuation call is safe.
/// `handylink-core` maps these into session-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Credentials ─────────────────────────────────────────────────
    /// The connection key cannot be sent as an HTTP header.
    #[error("Invalid connection key: {message}")]
    InvalidConnectionKey { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The call exceeded the timeout of its call class.
    #[error("{endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    // ── Vendor ──────────────────────────────────────────────────────
    /// Non-2xx response, or a 2xx response carrying an in-band `error` object.
    #[error("Vendor API error (HTTP {status}): {message}")]
    Vendor {
        status: u16,
        code: Option<i64>,
        name: Option<String>,
        message: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the call expired before the relay answered.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if the relay or device explicitly refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Vendor { .. })
    }

    /// Returns `true` if the relay could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_connect())
    }

    /// HTTP status of a vendor rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Vendor { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
