// ── Device domain types ──

use handylink_api::{DeviceInfo, FirmwareStatus, SlideSettings, SlideState};
use serde::{Deserialize, Serialize};

use super::mode::ModeState;
use crate::error::CoreError;

/// Stroke excursion bounds, 0-100 percent of the physical slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRange {
    pub min: u8,
    pub max: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<bool>,
}

impl SlideRange {
    /// Validated constructor: both bounds in 0..=100 and `min <= max`.
    pub fn new(min: u8, max: u8) -> Result<Self, CoreError> {
        if max > 100 {
            return Err(CoreError::validation("max", format!("{max} is outside 0..=100")));
        }
        if min > max {
            return Err(CoreError::validation(
                "min",
                format!("{min} is greater than max {max}"),
            ));
        }
        Ok(Self {
            min,
            max,
            fixed: None,
        })
    }

    /// The whole stroke.
    pub fn full() -> Self {
        Self {
            min: 0,
            max: 100,
            fixed: None,
        }
    }

    /// A zero-width range that parks the slide at one position.
    pub fn point(position: u8) -> Self {
        Self {
            min: position,
            max: position,
            fixed: None,
        }
    }
}

impl From<SlideRange> for SlideSettings {
    fn from(range: SlideRange) -> Self {
        Self {
            min: range.min,
            max: range.max,
            fixed: range.fixed,
        }
    }
}

/// Snapshot returned by `Handy::status`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ModeState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide: Option<SlideState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
}

/// Firmware compatibility summary.
#[derive(Debug, Clone, Serialize)]
pub struct FirmwareReport {
    pub firmware_status: u8,
    pub update_required: bool,
    pub update_message: String,
    pub current_version: String,
}

impl FirmwareReport {
    pub fn from_info(info: &DeviceInfo) -> Self {
        let status = info.fw_status.unwrap_or(FirmwareStatus::UpToDate);
        let update_message = match status {
            FirmwareStatus::UpToDate => "Firmware is up to date".to_owned(),
            FirmwareStatus::UpdateAvailable => "Firmware update available".to_owned(),
            FirmwareStatus::UpdateRequired => "Firmware update required".to_owned(),
            FirmwareStatus::Unknown(code) => format!("Unknown firmware status {code}"),
        };

        Self {
            firmware_status: status.into(),
            update_required: status == FirmwareStatus::UpdateRequired,
            update_message,
            current_version: info.fw_version.clone(),
        }
    }
}
