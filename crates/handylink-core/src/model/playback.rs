// ── Script playback state ──

use handylink_api::HsspStateResponse;
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// Cached view of synchronized script playback. The device is
/// authoritative; this is refreshed by polling and after each action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptPlaybackState {
    pub state: PlaybackState,
    pub url: Option<String>,
    /// Playback position in milliseconds.
    pub position: Option<f64>,
    /// Script duration in milliseconds.
    pub duration: Option<f64>,
    #[serde(rename = "loop")]
    pub looping: bool,
}

impl ScriptPlaybackState {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Merge a device report into the cached state. Fields the device
    /// omitted keep their cached values.
    pub fn apply(&mut self, report: &HsspStateResponse) {
        self.state = if report.is_playing() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        };
        if let Some(url) = &report.url {
            self.url = Some(url.clone());
        }
        if report.position.is_some() {
            self.position = report.position;
        }
        if report.duration.is_some() {
            self.duration = report.duration;
        }
        if let Some(looping) = report.looping {
            self.looping = looping;
        }
    }
}
