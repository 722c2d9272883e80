// ── Command API ──
//
// Abstract application commands arrive as `(kind, params)` pairs. They are
// parsed and validated into a typed `Command` before any vendor call is
// made, so a bad parameter never produces a partial side effect.

use serde::Serialize;
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::error::CoreError;
use crate::model::{ModeState, SlideRange};

const DEFAULT_VELOCITY: u8 = 50;
const DEFAULT_POSITION: u8 = 50;

/// Command names accepted by `Handy::execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    #[strum(to_string = "set_velocity", serialize = "set_speed")]
    SetVelocity,
    SetPosition,
    SetRange,
    Start,
    Stop,
    PlayScript,
    StopScript,
    SeekScript,
    DirectPosition,
    SyncTime,
}

/// Parameters for starting synchronized playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest {
    pub url: String,
    /// Script position to start from, in milliseconds.
    pub start_time_ms: i64,
    pub looping: bool,
    /// Caller-supplied clock offset; measured when absent.
    pub offset_ms: Option<f64>,
    /// Device-side setup wait; the session default applies when absent.
    pub setup_timeout_ms: Option<u64>,
}

impl PlayRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            start_time_ms: 0,
            looping: false,
            offset_ms: None,
            setup_timeout_ms: None,
        }
    }

    /// Checks shared by parsed and directly built requests.
    pub fn validate(&self) -> Result<(), CoreError> {
        url::Url::parse(&self.url).map_err(|e| CoreError::validation("url", e.to_string()))?;
        if self.start_time_ms < 0 {
            return Err(CoreError::validation("startTime", "must not be negative"));
        }
        if self.offset_ms.is_some_and(|ms| !ms.is_finite()) {
            return Err(CoreError::validation("csOffset", "expected a number"));
        }
        Ok(())
    }
}

/// A validated command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── HAMP ─────────────────────────────────────────────────────────
    SetVelocity { velocity: u8 },
    SetPosition { position: u8 },
    SetRange { range: SlideRange },
    Start { velocity: Option<u8> },
    Stop,

    // ── HSSP ─────────────────────────────────────────────────────────
    PlayScript(PlayRequest),
    StopScript,
    SeekScript { time_ms: i64, offset_ms: Option<f64> },

    // ── HDSP ─────────────────────────────────────────────────────────
    DirectPosition { position: u8 },

    // ── HSTP ─────────────────────────────────────────────────────────
    SyncTime,
}

impl Command {
    /// Parse and validate a `(kind, params)` pair.
    ///
    /// `params` may be `null` or an object; unknown keys are ignored.
    pub fn parse(kind: &str, params: &Value) -> Result<Self, CoreError> {
        let kind: CommandKind = kind.parse().map_err(|_| CoreError::UnknownCommand {
            kind: kind.to_owned(),
        })?;

        let empty = Map::new();
        let params = match params {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err(CoreError::validation("params", "expected an object")),
        };

        let command = match kind {
            CommandKind::SetVelocity => Self::SetVelocity {
                velocity: percent(params, "velocity")?.unwrap_or(DEFAULT_VELOCITY),
            },
            CommandKind::SetPosition => Self::SetPosition {
                position: percent(params, "position")?.unwrap_or(DEFAULT_POSITION),
            },
            CommandKind::SetRange => Self::SetRange {
                range: SlideRange::new(
                    percent(params, "min")?.unwrap_or(0),
                    percent(params, "max")?.unwrap_or(100),
                )?,
            },
            CommandKind::Start => Self::Start {
                velocity: percent(params, "velocity")?,
            },
            CommandKind::Stop => Self::Stop,
            CommandKind::PlayScript => {
                let request = PlayRequest {
                    url: script_url(params)?,
                    start_time_ms: millis(params, "startTime")?.unwrap_or(0),
                    looping: flag(params, "loop")?.unwrap_or(false),
                    offset_ms: number(params, "csOffset")?,
                    setup_timeout_ms: millis(params, "timeout")?
                        .map(|ms| u64::try_from(ms).unwrap_or_default()),
                };
                request.validate()?;
                Self::PlayScript(request)
            }
            CommandKind::StopScript => Self::StopScript,
            CommandKind::SeekScript => Self::SeekScript {
                time_ms: millis(params, "time")?
                    .ok_or_else(|| CoreError::validation("time", "is required"))?,
                offset_ms: number(params, "csOffset")?,
            },
            CommandKind::DirectPosition => Self::DirectPosition {
                position: percent(params, "position")?
                    .ok_or_else(|| CoreError::validation("position", "is required"))?,
            },
            CommandKind::SyncTime => Self::SyncTime,
        };
        Ok(command)
    }

    /// Re-check a command that was built directly rather than parsed.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::SetVelocity { velocity } | Self::Start { velocity: Some(velocity) } => {
                within_percent("velocity", *velocity)
            }
            Self::SetPosition { position } | Self::DirectPosition { position } => {
                within_percent("position", *position)
            }
            Self::SetRange { range } => SlideRange::new(range.min, range.max).map(|_| ()),
            Self::PlayScript(request) => request.validate(),
            Self::SeekScript { time_ms, offset_ms } => {
                if *time_ms < 0 {
                    return Err(CoreError::validation("time", "must not be negative"));
                }
                if offset_ms.is_some_and(|ms| !ms.is_finite()) {
                    return Err(CoreError::validation("csOffset", "expected a number"));
                }
                Ok(())
            }
            Self::Start { velocity: None } | Self::Stop | Self::StopScript | Self::SyncTime => {
                Ok(())
            }
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::SetVelocity { .. } => CommandKind::SetVelocity,
            Self::SetPosition { .. } => CommandKind::SetPosition,
            Self::SetRange { .. } => CommandKind::SetRange,
            Self::Start { .. } => CommandKind::Start,
            Self::Stop => CommandKind::Stop,
            Self::PlayScript(_) => CommandKind::PlayScript,
            Self::StopScript => CommandKind::StopScript,
            Self::SeekScript { .. } => CommandKind::SeekScript,
            Self::DirectPosition { .. } => CommandKind::DirectPosition,
            Self::SyncTime => CommandKind::SyncTime,
        }
    }

    /// The mode the device must be in before this command's calls.
    pub fn required_mode(&self) -> Option<ModeState> {
        match self {
            Self::SetVelocity { .. }
            | Self::SetPosition { .. }
            | Self::SetRange { .. }
            | Self::Start { .. }
            | Self::Stop => Some(ModeState::Hamp),
            Self::PlayScript(_) | Self::StopScript | Self::SeekScript { .. } => {
                Some(ModeState::Hssp)
            }
            Self::DirectPosition { .. } => Some(ModeState::Hdsp),
            Self::SyncTime => None,
        }
    }
}

/// Outcome of a successful command: the raw body of its action call.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub ok: bool,
    pub kind: CommandKind,
    pub payload: Value,
}

impl CommandResult {
    pub(crate) fn new(kind: CommandKind, payload: Value) -> Self {
        Self {
            ok: true,
            kind,
            payload,
        }
    }
}

// ── Parameter helpers ────────────────────────────────────────────────

fn number(params: &Map<String, Value>, field: &str) -> Result<Option<f64>, CoreError> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or_else(|| CoreError::validation(field, "expected a number")),
    }
}

/// A 0-100 percentage, rounded to the nearest integer.
fn percent(params: &Map<String, Value>, field: &str) -> Result<Option<u8>, CoreError> {
    let Some(value) = number(params, field)? else {
        return Ok(None);
    };
    if !(0.0..=100.0).contains(&value) {
        return Err(CoreError::validation(
            field,
            format!("{value} is outside 0..=100"),
        ));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
    let rounded = value.round() as u8;
    Ok(Some(rounded))
}

/// A non-negative millisecond value.
fn millis(params: &Map<String, Value>, field: &str) -> Result<Option<i64>, CoreError> {
    let Some(value) = number(params, field)? else {
        return Ok(None);
    };
    if value < 0.0 {
        return Err(CoreError::validation(field, "must not be negative"));
    }
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    let rounded = value.round() as i64;
    Ok(Some(rounded))
}

fn flag(params: &Map<String, Value>, field: &str) -> Result<Option<bool>, CoreError> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(CoreError::validation(field, "expected a boolean")),
    }
}

fn within_percent(field: &str, value: u8) -> Result<(), CoreError> {
    if value > 100 {
        return Err(CoreError::validation(
            field,
            format!("{value} is outside 0..=100"),
        ));
    }
    Ok(())
}

fn script_url(params: &Map<String, Value>) -> Result<String, CoreError> {
    params
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| CoreError::validation("url", "is required"))
}
