// ── Command dispatch ──
//
// Maps a validated `Command` onto an ordered sequence of vendor calls:
// connectivity check, mode precondition, configuration calls, then one
// action call. There is no rollback: if a later call fails, earlier
// calls stay applied.

use handylink_api::HandyClient;
use tracing::debug;

use crate::clock::{ClockOffset, ClockSyncEstimator};
use crate::command::{Command, CommandResult};
use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::{ModeState, SlideRange};
use crate::pattern::PatternExecutor;
use crate::session::SessionState;

/// Who issued a command. Pattern steps must not cancel their own run
/// when they trigger a mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Caller,
    Pattern,
}

/// Borrowed view of one session's collaborators.
///
/// Callers must hold the session lock and pass its state in, which keeps
/// execution serialized per session.
pub struct CommandDispatcher<'a> {
    client: &'a HandyClient,
    config: &'a SessionConfig,
    estimator: &'a ClockSyncEstimator,
    patterns: &'a PatternExecutor,
}

impl<'a> CommandDispatcher<'a> {
    pub(crate) fn new(
        client: &'a HandyClient,
        config: &'a SessionConfig,
        estimator: &'a ClockSyncEstimator,
        patterns: &'a PatternExecutor,
    ) -> Self {
        Self {
            client,
            config,
            estimator,
            patterns,
        }
    }

    pub async fn dispatch(
        &self,
        state: &mut SessionState,
        command: Command,
        origin: Origin,
    ) -> Result<CommandResult, CoreError> {
        let kind = command.kind();
        debug!(%kind, ?origin, "dispatching command");

        self.check_connected().await?;

        let client = self.client;
        let payload = match command {
            // ── HAMP ─────────────────────────────────────────────────
            Command::SetVelocity { velocity } => {
                self.ensure_mode(state, ModeState::Hamp, origin).await?;
                let payload = client.set_hamp_velocity(velocity).await?;
                state.last_velocity = Some(velocity);
                payload
            }
            Command::SetPosition { position } => {
                self.ensure_mode(state, ModeState::Hamp, origin).await?;
                client.set_slide(&SlideRange::point(position).into()).await?
            }
            Command::SetRange { range } => {
                self.ensure_mode(state, ModeState::Hamp, origin).await?;
                client.set_slide(&range.into()).await?
            }
            Command::Start { velocity } => {
                self.ensure_mode(state, ModeState::Hamp, origin).await?;
                if let Some(velocity) = velocity {
                    client.set_hamp_velocity(velocity).await?;
                    state.last_velocity = Some(velocity);
                }
                client.hamp_start().await?
            }
            Command::Stop => {
                self.ensure_mode(state, ModeState::Hamp, origin).await?;
                client.hamp_stop().await?
            }

            // ── HSSP ─────────────────────────────────────────────────
            Command::PlayScript(request) => {
                let offset = self.ensure_offset(&mut state.offset, request.offset_ms).await?;
                self.ensure_mode(state, ModeState::Hssp, origin).await?;
                let setup_timeout = request
                    .setup_timeout_ms
                    .unwrap_or(self.config.script_setup_timeout_ms);
                state
                    .script
                    .play(client, self.estimator, offset, &request, setup_timeout)
                    .await?
            }
            Command::StopScript => {
                self.ensure_mode(state, ModeState::Hssp, origin).await?;
                state.script.stop(client).await?
            }
            Command::SeekScript { time_ms, offset_ms } => {
                let offset = self.ensure_offset(&mut state.offset, offset_ms).await?;
                self.ensure_mode(state, ModeState::Hssp, origin).await?;
                state
                    .script
                    .seek(client, self.estimator, offset, time_ms)
                    .await?
            }

            // ── HDSP ─────────────────────────────────────────────────
            Command::DirectPosition { position } => {
                self.ensure_mode(state, ModeState::Hdsp, origin).await?;
                client.hdsp_position(position).await?
            }

            // ── HSTP ─────────────────────────────────────────────────
            Command::SyncTime => client.sync_hstp_time().await?,
        };

        Ok(CommandResult::new(kind, payload))
    }

    /// Use the supplied offset, the cached one if still fresh, or measure
    /// a new one. A failed measurement leaves the cache untouched.
    pub async fn ensure_offset(
        &self,
        offset: &mut ClockOffset,
        supplied: Option<f64>,
    ) -> Result<f64, CoreError> {
        if let Some(offset_ms) = supplied {
            return Ok(offset_ms);
        }
        if offset.is_fresh(self.config.offset_ttl) {
            return Ok(offset.offset_ms);
        }

        debug!("clock offset missing or stale, measuring");
        let measured = self
            .estimator
            .compute(self.client, self.config.offset_samples)
            .await?;
        *offset = measured;
        Ok(measured.offset_ms)
    }

    async fn ensure_mode(
        &self,
        state: &mut SessionState,
        target: ModeState,
        origin: Origin,
    ) -> Result<(), CoreError> {
        let patterns = self.patterns;
        state
            .modes
            .ensure_mode(self.client, target, || {
                if origin == Origin::Caller {
                    patterns.cancel();
                }
            })
            .await?;
        Ok(())
    }

    async fn check_connected(&self) -> Result<(), CoreError> {
        if self.client.is_connected().await? {
            Ok(())
        } else {
            Err(CoreError::Connectivity {
                message: "device is not connected to the relay".into(),
            })
        }
    }
}
