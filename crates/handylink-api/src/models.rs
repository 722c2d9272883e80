// Handy REST API v2 wire types
//
// Request and response bodies exactly as the relay sends them (camelCase).
// Responses keep unknown fields in `extra` where the relay is known to grow
// new fields between firmware releases.

use serde::{Deserialize, Serialize};

// ── Enums ────────────────────────────────────────────────────────────

/// Wire-level operating mode (`GET|PUT /mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Mode {
    Hamp,
    Hdsp,
    Hssp,
    Maintenance,
}

impl TryFrom<u8> for Mode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Hamp),
            1 => Ok(Self::Hdsp),
            2 => Ok(Self::Hssp),
            3 => Ok(Self::Maintenance),
            other => Err(format!("unknown device mode {other}")),
        }
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Hamp => 0,
            Mode::Hdsp => 1,
            Mode::Hssp => 2,
            Mode::Maintenance => 3,
        }
    }
}

/// Firmware compatibility reported in `/info`.
///
/// `UpdateRequired` means the device still runs a firmware that cannot speak
/// this protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum FirmwareStatus {
    UpToDate,
    UpdateAvailable,
    UpdateRequired,
    Unknown(u8),
}

impl From<u8> for FirmwareStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::UpToDate,
            1 => Self::UpdateAvailable,
            2 => Self::UpdateRequired,
            other => Self::Unknown(other),
        }
    }
}

impl From<FirmwareStatus> for u8 {
    fn from(status: FirmwareStatus) -> Self {
        match status {
            FirmwareStatus::UpToDate => 0,
            FirmwareStatus::UpdateAvailable => 1,
            FirmwareStatus::UpdateRequired => 2,
            FirmwareStatus::Unknown(other) => other,
        }
    }
}

// ── Device ───────────────────────────────────────────────────────────

/// `GET /connected`
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectedResponse {
    #[serde(default)]
    pub connected: bool,
}

/// `GET /info`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default)]
    pub fw_version: String,
    #[serde(default)]
    pub fw_status: Option<FirmwareStatus>,
    #[serde(default)]
    pub hw_version: serde_json::Value,
    #[serde(default)]
    pub model: serde_json::Value,
    #[serde(default)]
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeviceInfo {
    /// The model identifier as the OTA endpoint expects it.
    pub fn model_name(&self) -> String {
        match &self.model {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// `GET /mode`
#[derive(Debug, Clone, Deserialize)]
pub struct ModeResponse {
    pub mode: Mode,
}

/// `PUT /mode` body.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ModeUpdate {
    pub mode: Mode,
}

// ── Slide ────────────────────────────────────────────────────────────

/// `GET /slide`. The relay reports positions as floats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SlideState {
    pub min: f64,
    pub max: f64,
}

/// `PUT /slide` body (0-100 percent of the stroke).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SlideSettings {
    pub min: u8,
    pub max: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<bool>,
}

// ── Timing ───────────────────────────────────────────────────────────

/// `GET /servertime`
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTimeResponse {
    /// Relay clock in epoch milliseconds.
    pub server_time: f64,
}

// ── HAMP / HDSP ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub(crate) struct VelocityUpdate {
    pub velocity: u8,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PositionCommand {
    pub position: u8,
}

// ── HSSP ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TimeoutSetting {
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HsspPlay<'a> {
    pub url: &'a str,
    pub server_time: i64,
    pub start_time: i64,
    #[serde(rename = "loop")]
    pub looping: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HsspSeek {
    pub server_time: i64,
    pub time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LoopSetting {
    #[serde(rename = "loop")]
    pub looping: bool,
}

/// `GET /hssp/state`
///
/// Vendor state codes: 1 need-sync, 2 need-setup, 3 stopped, 4 playing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HsspStateResponse {
    #[serde(default)]
    pub state: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub position: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default, rename = "loop")]
    pub looping: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HsspStateResponse {
    pub const STATE_NEED_SYNC: i64 = 1;
    pub const STATE_NEED_SETUP: i64 = 2;
    pub const STATE_STOPPED: i64 = 3;
    pub const STATE_PLAYING: i64 = 4;

    pub fn is_playing(&self) -> bool {
        self.state == Self::STATE_PLAYING
    }
}

// ── HSTP ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub(crate) struct OffsetSetting {
    pub offset: i64,
}
