//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use handylink_config::ConfigError;
use handylink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device ───────────────────────────────────────────────────────
    #[error("Device not reachable: {message}")]
    #[diagnostic(
        code(handylink::connectivity),
        help(
            "Check that the Handy is powered on and connected to WiFi.\n\
             The relay reports the device as offline until it reconnects."
        )
    )]
    Connectivity { message: String },

    #[error("Pairing failed: {reason}")]
    #[diagnostic(
        code(handylink::pairing),
        help(
            "Verify the connection key shown in the Handy app.\n\
             Store it with: handylink config set-key <KEY>"
        )
    )]
    Pairing { reason: String },

    #[error("Firmware {version} is not supported")]
    #[diagnostic(
        code(handylink::firmware),
        help("Update the device firmware from the Handy onboarding site, then pair again.")
    )]
    FirmwareIncompatible { version: String },

    #[error("No connection key configured for profile '{profile}'")]
    #[diagnostic(
        code(handylink::no_credentials),
        help(
            "Pass --connection-key, set HANDYLINK_CONNECTION_KEY,\n\
             or run: handylink config set-key <KEY>"
        )
    )]
    NoCredentials { profile: String },

    // ── Orchestration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(handylink::mode_transition),
        help("The device mode is re-queried on the next command.")
    )]
    ModeTransition(Box<CoreError>),

    #[error(transparent)]
    #[diagnostic(
        code(handylink::clock_sync),
        help("No offset was stored. Retry, or pass --offset to skip measuring.")
    )]
    ClockSync(Box<CoreError>),

    // ── Vendor ───────────────────────────────────────────────────────
    #[error("Request rejected (HTTP {status}): {message}")]
    #[diagnostic(code(handylink::rejected))]
    Rejected { status: u16, message: String },

    #[error("{endpoint} timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(handylink::timeout),
        help(
            "The device may still have acted on the request.\n\
             Increase the limit with --timeout or check device connectivity."
        )
    )]
    Timeout { endpoint: String, timeout_ms: u64 },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(handylink::validation))]
    Validation { field: String, reason: String },

    #[error("Unknown {what} '{name}'")]
    #[diagnostic(code(handylink::unknown), help("Expected one of: {expected}"))]
    Unknown {
        what: String,
        name: String,
        expected: String,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(handylink::profile_not_found),
        help("Create one with: handylink config set-profile {name}")
    )]
    ProfileNotFound { name: String },

    #[error(transparent)]
    #[diagnostic(code(handylink::config))]
    Config(Box<ConfigError>),

    #[error("Internal error: {0}")]
    #[diagnostic(code(handylink::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(handylink::json), help("Pass --params as a JSON object, e.g. '{{\"velocity\": 60}}'"))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Connectivity { .. } => exit_code::CONNECTION,
            Self::Pairing { .. } | Self::FirmwareIncompatible { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::ModeTransition(source) | Self::ClockSync(source) if source.is_timeout() => {
                exit_code::TIMEOUT
            }
            Self::Rejected { .. } | Self::ModeTransition(_) | Self::ClockSync(_) => {
                exit_code::REJECTED
            }
            Self::Validation { .. } | Self::Unknown { .. } | Self::Json(_) => exit_code::USAGE,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Connectivity { message } => CliError::Connectivity { message },
            CoreError::Pairing { reason } => CliError::Pairing { reason },
            CoreError::FirmwareIncompatible { version } => {
                CliError::FirmwareIncompatible { version }
            }
            CoreError::NotPaired => CliError::Pairing {
                reason: "no device paired".into(),
            },
            err @ CoreError::ModeTransition { .. } => CliError::ModeTransition(Box::new(err)),
            err @ CoreError::ClockSync { .. } => CliError::ClockSync(Box::new(err)),
            CoreError::UnknownCommand { kind } => CliError::Unknown {
                what: "command".into(),
                name: kind,
                expected: "start, stop, set_velocity, set_position, set_range, play_script, \
                           stop_script, seek_script, direct_position, sync_time"
                    .into(),
            },
            CoreError::UnknownPattern { name } => CliError::Unknown {
                what: "pattern".into(),
                name,
                expected: "edge, speed, slow, default".into(),
            },
            CoreError::Validation { field, reason } => CliError::Validation { field, reason },
            CoreError::Timeout {
                endpoint,
                timeout_ms,
            } => CliError::Timeout {
                endpoint,
                timeout_ms,
            },
            CoreError::Vendor {
                status,
                code: _,
                message,
            } => CliError::Rejected { status, message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound { name },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}
