// ── Session facade ──
//
// The surface the outer layers (CLI, web services) talk to. One `Handy`
// per user: it owns at most one paired `DeviceSession` and swaps it
// atomically on pair/unpair.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use handylink_api::{DeviceInfo, FirmwareStatus, HandyClient};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::clock::{Clock, ClockOffset, ClockSyncEstimator, SystemClock};
use crate::command::{Command, CommandResult, PlayRequest};
use crate::config::{SessionConfig, build_transport};
use crate::error::CoreError;
use crate::model::{DeviceStatus, FirmwareReport, ModeState, ScriptPlaybackState};
use crate::pattern::{Pattern, PatternTicket};
use crate::session::DeviceSession;

/// Per-user facade over one paired device.
pub struct Handy {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    session: ArcSwapOption<DeviceSession>,
}

impl std::fmt::Debug for Handy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handy")
            .field("api_url", &self.config.api_url)
            .field("paired", &self.is_paired())
            .finish_non_exhaustive()
    }
}

impl Handy {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Use a custom local clock (tests, simulated time).
    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            session: ArcSwapOption::empty(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_paired(&self) -> bool {
        self.session.load().is_some()
    }

    /// The paired session, or `NotPaired`.
    pub fn session(&self) -> Result<Arc<DeviceSession>, CoreError> {
        self.session.load_full().ok_or(CoreError::NotPaired)
    }

    // ── Pairing ──────────────────────────────────────────────────

    /// Validate `connection_key` against the relay and open a session.
    ///
    /// The device must be online and report a firmware that speaks this
    /// protocol version. Replaces (and shuts down) any previous session.
    pub async fn pair(&self, connection_key: &SecretString) -> Result<DeviceInfo, CoreError> {
        self.config.validate()?;
        let transport = build_transport(&self.config);
        let client = HandyClient::from_connection_key(&self.config.api_url, connection_key, &transport)?;

        let connected = client.is_connected().await.map_err(pairing_error)?;
        if !connected {
            return Err(CoreError::Connectivity {
                message: "device is not connected to the relay".into(),
            });
        }

        let info = client.info().await.map_err(pairing_error)?;
        match info.fw_status {
            None => {
                return Err(CoreError::Pairing {
                    reason: "device did not report a firmware status".into(),
                });
            }
            Some(FirmwareStatus::UpdateRequired) => {
                return Err(CoreError::FirmwareIncompatible {
                    version: info.fw_version.clone(),
                });
            }
            Some(_) => {}
        }

        let session = DeviceSession::new(
            client,
            self.config.clone(),
            ClockSyncEstimator::new(Arc::clone(&self.clock)),
            info.clone(),
        );
        if let Some(previous) = self.session.swap(Some(Arc::new(session))) {
            previous.shutdown();
        }

        info!(fw_version = %info.fw_version, model = %info.model_name(), "device paired");
        Ok(info)
    }

    /// Drop the session. Returns `false` if nothing was paired.
    pub fn unpair(&self) -> bool {
        match self.session.swap(None) {
            Some(session) => {
                session.shutdown();
                info!("device unpaired");
                true
            }
            None => false,
        }
    }

    // ── Status ───────────────────────────────────────────────────

    /// Connectivity plus, when online, mode, slide range and device info.
    pub async fn status(&self) -> Result<DeviceStatus, CoreError> {
        let session = self.session()?;
        let client = session.client();

        if !client.is_connected().await? {
            return Ok(DeviceStatus {
                connected: false,
                mode: None,
                slide: None,
                device_info: None,
            });
        }

        let device_info = client.info().await?;
        let mode = session.query_mode().await?;
        let slide = session.slide().await?;

        Ok(DeviceStatus {
            connected: true,
            mode: Some(mode),
            slide: Some(slide),
            device_info: Some(device_info),
        })
    }

    pub async fn check_firmware(&self) -> Result<FirmwareReport, CoreError> {
        let session = self.session()?;
        let info = session.client().info().await?;
        Ok(FirmwareReport::from_info(&info))
    }

    /// Latest published firmware for the paired device's model and branch.
    pub async fn latest_firmware(&self) -> Result<Value, CoreError> {
        let session = self.session()?;
        let info = session.device_info();
        let model = info.model_name();
        if model.is_empty() {
            return Err(CoreError::validation("model", "device did not report a model"));
        }
        debug!(%model, branch = %info.branch, "looking up latest firmware");
        Ok(session
            .client()
            .latest_firmware(&model, &info.branch)
            .await?)
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Parse, validate and run an abstract command.
    pub async fn execute(&self, kind: &str, params: &Value) -> Result<CommandResult, CoreError> {
        let command = Command::parse(kind, params)?;
        self.session()?.execute(command).await
    }

    pub async fn set_mode(&self, mode: ModeState) -> Result<bool, CoreError> {
        self.session()?.set_mode(mode).await
    }

    // ── Script playback ──────────────────────────────────────────

    pub async fn play_script(&self, request: PlayRequest) -> Result<CommandResult, CoreError> {
        self.session()?.play_script(request).await
    }

    pub async fn stop_script(&self) -> Result<CommandResult, CoreError> {
        self.session()?.stop_script().await
    }

    pub async fn seek_script(
        &self,
        time_ms: i64,
        offset_ms: Option<f64>,
    ) -> Result<CommandResult, CoreError> {
        self.session()?.seek_script(time_ms, offset_ms).await
    }

    pub async fn set_loop(&self, looping: bool) -> Result<Value, CoreError> {
        self.session()?.set_loop(looping).await
    }

    pub fn script_state(&self) -> Result<ScriptPlaybackState, CoreError> {
        Ok(self.session()?.script_state())
    }

    pub async fn refresh_script_state(&self) -> Result<ScriptPlaybackState, CoreError> {
        self.session()?.refresh_script_state().await
    }

    pub fn subscribe_script(&self) -> Result<watch::Receiver<ScriptPlaybackState>, CoreError> {
        Ok(self.session()?.subscribe_script())
    }

    // ── Timing ───────────────────────────────────────────────────

    pub async fn compute_offset(&self, samples: Option<usize>) -> Result<ClockOffset, CoreError> {
        self.session()?.compute_offset(samples).await
    }

    /// One raw relay clock reading in epoch milliseconds.
    pub async fn server_time(&self) -> Result<f64, CoreError> {
        Ok(self.session()?.client().server_time().await?)
    }

    pub async fn hstp_status(&self) -> Result<Value, CoreError> {
        self.session()?.hstp_status().await
    }

    pub async fn set_device_offset(&self, offset_ms: i64) -> Result<Value, CoreError> {
        self.session()?.set_device_offset(offset_ms).await
    }

    pub async fn start_hstp_sync(&self, timeout_ms: Option<u64>) -> Result<Value, CoreError> {
        self.session()?.start_hstp_sync(timeout_ms).await
    }

    // ── Patterns ─────────────────────────────────────────────────

    /// Schedule a named pattern. `params.currentVelocity` overrides the
    /// session's remembered velocity.
    pub async fn execute_pattern(
        &self,
        name: &str,
        params: &Value,
    ) -> Result<PatternTicket, CoreError> {
        let pattern: Pattern = name.parse().map_err(|_| CoreError::UnknownPattern {
            name: name.to_owned(),
        })?;
        let current = match params.get("currentVelocity") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let velocity = value
                    .as_u64()
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| {
                        CoreError::validation("currentVelocity", "expected an integer 0..=100")
                    })?;
                Some(velocity)
            }
        };
        self.session()?.execute_pattern(pattern, current).await
    }

    pub fn cancel_pattern(&self) -> Result<bool, CoreError> {
        Ok(self.session()?.cancel_pattern())
    }
}

impl Drop for Handy {
    fn drop(&mut self) {
        if let Some(session) = self.session.swap(None) {
            session.shutdown();
        }
    }
}

/// Credential and firmware problems surface as pairing failures;
/// timeouts and unreachable relays keep their own category.
fn pairing_error(err: handylink_api::Error) -> CoreError {
    if err.is_rejection() {
        CoreError::Pairing {
            reason: err.to_string(),
        }
    } else {
        err.into()
    }
}
