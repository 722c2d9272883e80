// ── Domain model ──
//
// Canonical session-level types. Wire types from handylink-api are
// converted into these before they reach consumers.

pub mod device;
pub mod mode;
pub mod playback;

// ── Re-exports ──────────────────────────────────────────────────────

pub use device::{DeviceStatus, FirmwareReport, SlideRange};
pub use mode::ModeState;
pub use playback::{PlaybackState, ScriptPlaybackState};
