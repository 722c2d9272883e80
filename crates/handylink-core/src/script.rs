// ── Synchronized script playback ──
//
// STOPPED -> (setup + play) -> PLAYING -> (seek, stays PLAYING) -> (stop) -> STOPPED
//
// The cached playback state is published on a `watch` channel. While
// playing, a background poller refreshes it from `/hssp/state` until the
// device reports it stopped or the session is torn down.

use std::sync::Arc;
use std::time::Duration;

use handylink_api::HandyClient;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::ClockSyncEstimator;
use crate::command::PlayRequest;
use crate::error::CoreError;
use crate::model::{PlaybackState, ScriptPlaybackState};

/// `tokio::time::interval` panics on a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

struct Poller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Per-session playback orchestrator.
///
/// Lives inside the session state, so every operation runs under the
/// session lock. Mode and clock-offset preconditions are settled by the
/// dispatcher before these methods are called.
pub struct ScriptSyncOrchestrator {
    state_tx: Arc<watch::Sender<ScriptPlaybackState>>,
    poller: Option<Poller>,
    poll_interval: Duration,
    session_cancel: CancellationToken,
}

impl std::fmt::Debug for ScriptSyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptSyncOrchestrator")
            .field("state", &*self.state_tx.borrow())
            .field("polling", &self.is_polling())
            .finish_non_exhaustive()
    }
}

impl ScriptSyncOrchestrator {
    pub fn new(poll_interval: Duration, session_cancel: CancellationToken) -> Self {
        let (state_tx, _) = watch::channel(ScriptPlaybackState::default());
        Self {
            state_tx: Arc::new(state_tx),
            poller: None,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            session_cancel,
        }
    }

    // ── State observation ────────────────────────────────────────

    /// The cached playback state.
    pub fn snapshot(&self) -> ScriptPlaybackState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to playback state changes.
    pub fn subscribe(&self) -> watch::Receiver<ScriptPlaybackState> {
        self.state_tx.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .is_some_and(|p| !p.cancel.is_cancelled() && !p.handle.is_finished())
    }

    // ── Playback actions ─────────────────────────────────────────

    /// Set up and start playback.
    ///
    /// The server timestamp is estimated after setup completes, since the
    /// device-side setup wait can be several seconds long.
    pub async fn play(
        &mut self,
        client: &HandyClient,
        estimator: &ClockSyncEstimator,
        offset_ms: f64,
        request: &PlayRequest,
        setup_timeout_ms: u64,
    ) -> Result<Value, CoreError> {
        client.hssp_setup(setup_timeout_ms).await?;

        let server_time = to_wire_ms(estimator.estimate_server_time(offset_ms));
        let payload = client
            .hssp_play(
                &request.url,
                server_time,
                request.start_time_ms,
                request.looping,
            )
            .await?;

        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let start_position = request.start_time_ms as f64;
        self.state_tx.send_modify(|state| {
            state.state = PlaybackState::Playing;
            state.url = Some(request.url.clone());
            state.position = Some(start_position);
            state.looping = request.looping;
        });
        info!(url = %request.url, server_time, "script playback started");

        self.start_polling(client.clone());
        Ok(payload)
    }

    pub async fn stop(&mut self, client: &HandyClient) -> Result<Value, CoreError> {
        let payload = client.hssp_stop().await?;
        self.stop_polling();
        self.state_tx
            .send_modify(|state| state.state = PlaybackState::Stopped);
        info!("script playback stopped");
        Ok(payload)
    }

    /// Jump to `time_ms` without pausing playback.
    pub async fn seek(
        &mut self,
        client: &HandyClient,
        estimator: &ClockSyncEstimator,
        offset_ms: f64,
        time_ms: i64,
    ) -> Result<Value, CoreError> {
        let server_time = to_wire_ms(estimator.estimate_server_time(offset_ms));
        let payload = client.hssp_seek(server_time, time_ms).await?;

        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let position = time_ms as f64;
        self.state_tx
            .send_modify(|state| state.position = Some(position));
        debug!(time_ms, server_time, "script seek");
        Ok(payload)
    }

    /// Toggle looping. Valid in any playback state; no mode switch.
    pub async fn set_loop(
        &mut self,
        client: &HandyClient,
        looping: bool,
    ) -> Result<Value, CoreError> {
        let payload = client.set_hssp_loop(looping).await?;
        self.state_tx.send_modify(|state| state.looping = looping);
        Ok(payload)
    }

    /// Query the device and merge its report into the cache.
    pub async fn refresh(&mut self, client: &HandyClient) -> Result<ScriptPlaybackState, CoreError> {
        let report = client.hssp_state().await?;
        self.state_tx.send_modify(|state| state.apply(&report));
        if !report.is_playing() {
            self.stop_polling();
        }
        Ok(self.snapshot())
    }

    // ── Poller lifecycle ─────────────────────────────────────────

    fn start_polling(&mut self, client: HandyClient) {
        self.stop_polling();

        let cancel = self.session_cancel.child_token();
        let handle = tokio::spawn(poll_task(
            client,
            Arc::clone(&self.state_tx),
            self.poll_interval,
            cancel.clone(),
        ));
        self.poller = Some(Poller { cancel, handle });
    }

    /// Stop the background poller, if any.
    pub fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel.cancel();
        }
    }
}

impl Drop for ScriptSyncOrchestrator {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn to_wire_ms(ms: f64) -> i64 {
    ms.round() as i64
}

// ── Background task ──────────────────────────────────────────────

async fn poll_task(
    client: HandyClient,
    state_tx: Arc<watch::Sender<ScriptPlaybackState>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // A stop can land while the request is in flight; its result must
        // not overwrite the state the stop published.
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = client.hssp_state() => result,
        };
        match result {
            Ok(report) => {
                let applied = state_tx.send_if_modified(|state| {
                    if cancel.is_cancelled() {
                        return false;
                    }
                    state.apply(&report);
                    true
                });
                if !applied {
                    break;
                }
                if !report.is_playing() {
                    debug!(state = report.state, "device stopped playing, poller exiting");
                    break;
                }
            }
            Err(e) => warn!(error = %e, "script state poll failed"),
        }
    }
}
