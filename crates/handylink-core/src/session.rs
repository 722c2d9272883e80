// ── Device session ──
//
// One paired device. All commands for the session run under a single
// async mutex, so vendor calls are strictly ordered; pattern steps take
// the same lock. Cheaply cloneable via `Arc<SessionInner>`.

use std::sync::Arc;

use handylink_api::{DeviceInfo, HandyClient, SlideState};
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::{ClockOffset, ClockSyncEstimator};
use crate::command::{Command, CommandResult, PlayRequest};
use crate::config::SessionConfig;
use crate::dispatch::{CommandDispatcher, Origin};
use crate::error::CoreError;
use crate::mode::ModeController;
use crate::model::{ModeState, ScriptPlaybackState};
use crate::pattern::{Pattern, PatternExecutor, PatternStep, PatternTicket};
use crate::script::ScriptSyncOrchestrator;

const DEFAULT_VELOCITY: u8 = 50;

/// Mutable per-session state, guarded by the session lock.
#[derive(Debug)]
pub struct SessionState {
    pub(crate) modes: ModeController,
    pub(crate) offset: ClockOffset,
    pub(crate) last_velocity: Option<u8>,
    pub(crate) script: ScriptSyncOrchestrator,
}

pub(crate) struct SessionInner {
    pub(crate) client: HandyClient,
    pub(crate) config: SessionConfig,
    pub(crate) estimator: ClockSyncEstimator,
    pub(crate) info: DeviceInfo,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) patterns: PatternExecutor,
    script_rx: watch::Receiver<ScriptPlaybackState>,
    cancel: CancellationToken,
}

impl SessionInner {
    pub(crate) fn dispatcher(&self) -> CommandDispatcher<'_> {
        CommandDispatcher::new(&self.client, &self.config, &self.estimator, &self.patterns)
    }
}

/// A paired device and everything the session knows about it.
#[derive(Clone)]
pub struct DeviceSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("client", &self.inner.client)
            .field("fw_version", &self.inner.info.fw_version)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    pub fn new(
        client: HandyClient,
        config: SessionConfig,
        estimator: ClockSyncEstimator,
        info: DeviceInfo,
    ) -> Self {
        let cancel = CancellationToken::new();
        let script = ScriptSyncOrchestrator::new(config.poll_interval, cancel.clone());
        let script_rx = script.subscribe();
        let state = SessionState {
            modes: ModeController::new(config.mode_cache_ttl),
            offset: ClockOffset::default(),
            last_velocity: None,
            script,
        };

        Self {
            inner: Arc::new(SessionInner {
                client,
                config,
                estimator,
                info,
                state: Mutex::new(state),
                patterns: PatternExecutor::default(),
                script_rx,
                cancel,
            }),
        }
    }

    pub fn client(&self) -> &HandyClient {
        &self.inner.client
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Device info captured at pairing time.
    pub fn device_info(&self) -> &DeviceInfo {
        &self.inner.info
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Run a command. Cancels any running pattern first.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        command.validate()?;
        self.inner.patterns.cancel();
        let mut state = self.inner.state.lock().await;
        self.inner
            .dispatcher()
            .dispatch(&mut state, command, Origin::Caller)
            .await
    }

    pub async fn play_script(&self, request: PlayRequest) -> Result<CommandResult, CoreError> {
        self.execute(Command::PlayScript(request)).await
    }

    pub async fn stop_script(&self) -> Result<CommandResult, CoreError> {
        self.execute(Command::StopScript).await
    }

    pub async fn seek_script(
        &self,
        time_ms: i64,
        offset_ms: Option<f64>,
    ) -> Result<CommandResult, CoreError> {
        self.execute(Command::SeekScript { time_ms, offset_ms }).await
    }

    /// Toggle script looping. No mode switch, valid while stopped.
    pub async fn set_loop(&self, looping: bool) -> Result<Value, CoreError> {
        self.inner.patterns.cancel();
        let mut state = self.inner.state.lock().await;
        state.script.set_loop(&self.inner.client, looping).await
    }

    // ── Script state ─────────────────────────────────────────────

    /// Cached playback state (no vendor call).
    pub fn script_state(&self) -> ScriptPlaybackState {
        self.inner.script_rx.borrow().clone()
    }

    /// Query the device for its playback state.
    pub async fn refresh_script_state(&self) -> Result<ScriptPlaybackState, CoreError> {
        let mut state = self.inner.state.lock().await;
        state.script.refresh(&self.inner.client).await
    }

    /// Subscribe to playback state changes.
    pub fn subscribe_script(&self) -> watch::Receiver<ScriptPlaybackState> {
        self.inner.script_rx.clone()
    }

    // ── Clock offset ─────────────────────────────────────────────

    /// Measure the clock offset. On failure the previous offset is kept.
    pub async fn compute_offset(&self, samples: Option<usize>) -> Result<ClockOffset, CoreError> {
        let samples = samples.unwrap_or(self.inner.config.offset_samples);
        let mut state = self.inner.state.lock().await;
        let offset = self
            .inner
            .estimator
            .compute(&self.inner.client, samples)
            .await?;
        state.offset = offset;
        Ok(offset)
    }

    /// The last computed offset (possibly never computed).
    pub async fn offset(&self) -> ClockOffset {
        self.inner.state.lock().await.offset
    }

    // ── Mode ─────────────────────────────────────────────────────

    /// Switch the device into `mode` (no-op if already verified there).
    pub async fn set_mode(&self, mode: ModeState) -> Result<bool, CoreError> {
        self.inner.patterns.cancel();
        let mut state = self.inner.state.lock().await;
        state.modes.ensure_mode(&self.inner.client, mode, || {}).await
    }

    /// Ask the device for its mode and refresh the cache.
    pub async fn query_mode(&self) -> Result<ModeState, CoreError> {
        let mut state = self.inner.state.lock().await;
        let mode = ModeState::from(self.inner.client.mode().await?);
        state.modes.observe(mode);
        Ok(mode)
    }

    pub async fn cached_mode(&self) -> ModeState {
        self.inner.state.lock().await.modes.cached()
    }

    pub async fn slide(&self) -> Result<SlideState, CoreError> {
        Ok(self.inner.client.slide().await?)
    }

    // ── Patterns ─────────────────────────────────────────────────

    /// Schedule a pattern, replacing any running one.
    ///
    /// Relative patterns start from `current_velocity`, else the last
    /// velocity this session set, else 50.
    pub async fn execute_pattern(
        &self,
        pattern: Pattern,
        current_velocity: Option<u8>,
    ) -> Result<PatternTicket, CoreError> {
        self.inner.patterns.cancel();

        let current = match current_velocity {
            Some(v) if v > 100 => {
                return Err(CoreError::validation(
                    "currentVelocity",
                    format!("{v} is outside 0..=100"),
                ));
            }
            Some(v) => v,
            None => self
                .inner
                .state
                .lock()
                .await
                .last_velocity
                .unwrap_or(DEFAULT_VELOCITY),
        };

        Ok(self.run_steps(pattern, pattern.plan(current)))
    }

    pub(crate) fn run_steps(&self, pattern: Pattern, steps: Vec<PatternStep>) -> PatternTicket {
        self.inner.patterns.start(
            Arc::downgrade(&self.inner),
            &self.inner.cancel,
            pattern,
            steps,
        )
    }

    pub fn cancel_pattern(&self) -> bool {
        self.inner.patterns.cancel()
    }

    pub fn active_pattern(&self) -> Option<Pattern> {
        self.inner.patterns.active_pattern()
    }

    // ── HSTP ─────────────────────────────────────────────────────

    pub async fn hstp_status(&self) -> Result<Value, CoreError> {
        let _state = self.inner.state.lock().await;
        Ok(self.inner.client.hstp().await?)
    }

    pub async fn set_device_offset(&self, offset_ms: i64) -> Result<Value, CoreError> {
        self.inner.patterns.cancel();
        let _state = self.inner.state.lock().await;
        Ok(self.inner.client.set_hstp_offset(offset_ms).await?)
    }

    pub async fn start_hstp_sync(&self, timeout_ms: Option<u64>) -> Result<Value, CoreError> {
        let timeout_ms = timeout_ms.unwrap_or(self.inner.config.hstp_sync_timeout_ms);
        self.inner.patterns.cancel();
        let _state = self.inner.state.lock().await;
        Ok(self.inner.client.hstp_sync(timeout_ms).await?)
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Cancel the pattern run and the script poller.
    pub fn shutdown(&self) {
        self.inner.patterns.cancel();
        self.inner.cancel.cancel();
        debug!("session shut down");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::facade::Handy;

    async fn paired(server: &MockServer) -> Handy {
        Mock::given(method("GET"))
            .and(path("/connected"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "connected": true })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fwVersion": "3.2.3",
                "fwStatus": 0,
                "hwVersion": "1.0",
                "model": "H01",
                "branch": "master"
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "mode": 0 })))
            .mount(server)
            .await;

        let handy = Handy::new(SessionConfig {
            api_url: server.uri(),
            ..SessionConfig::default()
        });
        handy
            .pair(&SecretString::from("test-key".to_owned()))
            .await
            .unwrap();
        handy
    }

    #[tokio::test]
    async fn slow_step_delays_but_does_not_drop_the_next_one() {
        let server = MockServer::start().await;
        let handy = paired(&server).await;
        Mock::given(method("PUT"))
            .and(path("/hamp/velocity"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "result": 0 }))
                    .set_delay(Duration::from_millis(400)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/hamp/velocity"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 0 })))
            .mount(&server)
            .await;

        let steps = vec![
            PatternStep {
                at: Duration::ZERO,
                command: Command::SetVelocity { velocity: 30 },
            },
            PatternStep {
                at: Duration::from_millis(100),
                command: Command::SetVelocity { velocity: 70 },
            },
        ];
        let started = tokio::time::Instant::now();
        let ticket = handy.session().unwrap().run_steps(Pattern::Edge, steps);
        tokio::time::timeout(Duration::from_secs(5), ticket.wait())
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(400));

        let bodies: Vec<Value> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/hamp/velocity")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect();
        assert_eq!(
            bodies,
            vec![json!({ "velocity": 30 }), json!({ "velocity": 70 })]
        );
    }
}
