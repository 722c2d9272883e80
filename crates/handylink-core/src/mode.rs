// ── Mode state machine ──
//
// Tracks the device's operating mode and switches it before any
// mode-specific command. The cached mode is only trusted for `ttl`;
// after that (or after a failed switch) the device is asked again.

use std::time::Duration;

use handylink_api::HandyClient;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::ModeState;

/// Per-session mode cache and switcher.
#[derive(Debug)]
pub struct ModeController {
    cached: ModeState,
    verified_at: Option<Instant>,
    ttl: Duration,
}

impl ModeController {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cached: ModeState::Unknown,
            verified_at: None,
            ttl,
        }
    }

    /// The last verified mode (`Unknown` if never verified or invalidated).
    pub fn cached(&self) -> ModeState {
        self.cached
    }

    /// Whether the cached mode can be used without asking the device.
    pub fn is_fresh(&self) -> bool {
        self.cached != ModeState::Unknown
            && self.verified_at.is_some_and(|at| at.elapsed() < self.ttl)
    }

    /// Record a mode the device just reported or acknowledged.
    pub fn observe(&mut self, mode: ModeState) {
        self.cached = mode;
        self.verified_at = (mode != ModeState::Unknown).then(Instant::now);
    }

    /// Forget the cached mode so the next `ensure_mode` re-verifies.
    pub fn invalidate(&mut self) {
        self.cached = ModeState::Unknown;
        self.verified_at = None;
    }

    /// Make sure the device is in `target`, switching if needed.
    ///
    /// `before_switch` runs only when a switch is about to be issued (the
    /// session uses it to cancel a running pattern). Returns `true` if a
    /// switch call was made. Failures are not retried.
    pub async fn ensure_mode<F>(
        &mut self,
        client: &HandyClient,
        target: ModeState,
        before_switch: F,
    ) -> Result<bool, CoreError>
    where
        F: FnOnce(),
    {
        let Some(wire) = target.wire() else {
            return Err(CoreError::validation("mode", "cannot switch to UNKNOWN"));
        };

        if !self.is_fresh() {
            debug!(cached = %self.cached, "mode cache stale, querying device");
            match client.mode().await {
                Ok(mode) => self.observe(mode.into()),
                Err(e) => {
                    let from = self.cached;
                    self.invalidate();
                    return Err(CoreError::ModeTransition {
                        from,
                        to: target,
                        source: Box::new(e.into()),
                    });
                }
            }
        }

        if self.cached == target {
            return Ok(false);
        }

        let from = self.cached;
        before_switch();
        info!(%from, to = %target, "switching device mode");

        match client.set_mode(wire).await {
            Ok(_) => {
                self.observe(target);
                Ok(true)
            }
            Err(e) => {
                self.invalidate();
                Err(CoreError::ModeTransition {
                    from,
                    to: target,
                    source: Box::new(e.into()),
                })
            }
        }
    }
}
