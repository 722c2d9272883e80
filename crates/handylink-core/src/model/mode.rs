// ── Operating mode ──

use handylink_api::Mode;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The device's operating mode as the session last verified it.
///
/// `Unknown` until the first query, and again after a failed switch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ModeState {
    Hamp,
    Hdsp,
    Hssp,
    Maintenance,
    #[default]
    Unknown,
}

impl ModeState {
    /// The wire mode for a verified state; `None` for `Unknown`.
    pub fn wire(self) -> Option<Mode> {
        match self {
            Self::Hamp => Some(Mode::Hamp),
            Self::Hdsp => Some(Mode::Hdsp),
            Self::Hssp => Some(Mode::Hssp),
            Self::Maintenance => Some(Mode::Maintenance),
            Self::Unknown => None,
        }
    }
}

impl From<Mode> for ModeState {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Hamp => Self::Hamp,
            Mode::Hdsp => Self::Hdsp,
            Mode::Hssp => Self::Hssp,
            Mode::Maintenance => Self::Maintenance,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("hssp".parse::<ModeState>().unwrap(), ModeState::Hssp);
        assert_eq!("HAMP".parse::<ModeState>().unwrap(), ModeState::Hamp);
        assert!("turbo".parse::<ModeState>().is_err());
    }

    #[test]
    fn unknown_has_no_wire_mode() {
        assert_eq!(ModeState::Unknown.wire(), None);
        assert_eq!(ModeState::from(Mode::Hdsp).wire(), Some(Mode::Hdsp));
    }
}
