// handylink-core: Device orchestration between handylink-api and consumers (CLI, services).

pub mod clock;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod mode;
pub mod model;
pub mod pattern;
pub mod registry;
pub mod script;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use clock::{Clock, ClockOffset, ClockSyncEstimator, ServerTimeSource, SystemClock};
pub use command::{Command, CommandKind, CommandResult, PlayRequest};
pub use config::{CallTimeouts, SessionConfig};
pub use error::CoreError;
pub use facade::Handy;
pub use mode::ModeController;
pub use pattern::{Pattern, PatternStep, PatternTicket};
pub use registry::SessionRegistry;
pub use session::DeviceSession;

pub use model::{
    DeviceStatus, FirmwareReport, ModeState, PlaybackState, ScriptPlaybackState, SlideRange,
};

// Vendor types that appear in the facade's signatures.
pub use handylink_api::{DeviceInfo, FirmwareStatus};
