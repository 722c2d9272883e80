// ── Clock-offset estimation ──
//
// NTP-style round-trip sampling against the relay's `/servertime`.
// Samples are taken strictly one after another; the offset is the plain
// mean with no outlier rejection, and a single failed sample discards
// the whole computation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use handylink_api::HandyClient;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::error::CoreError;

// ── Time sources ─────────────────────────────────────────────────

/// Local wall clock in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// `chrono::Utc` backed clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn now_ms(&self) -> f64 {
        Utc::now().timestamp_millis() as f64
    }
}

/// Anything that can report the relay's current time.
pub trait ServerTimeSource: Sync {
    fn server_time(&self) -> impl Future<Output = Result<f64, CoreError>> + Send;
}

impl ServerTimeSource for HandyClient {
    fn server_time(&self) -> impl Future<Output = Result<f64, CoreError>> + Send {
        async move { Ok(HandyClient::server_time(self).await?) }
    }
}

// ── ClockOffset ──────────────────────────────────────────────────

/// Estimated `server - local` clock difference.
///
/// `computed` separates "never measured" from a measured offset of zero.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockOffset {
    pub offset_ms: f64,
    pub computed_at: Option<DateTime<Utc>>,
    pub sample_count: usize,
    pub computed: bool,
    #[serde(skip)]
    measured_at: Option<Instant>,
}

impl ClockOffset {
    /// Whether this offset was measured within `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.computed && self.measured_at.is_some_and(|at| at.elapsed() < ttl)
    }
}

// ── Estimator ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ClockSyncEstimator {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ClockSyncEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockSyncEstimator").finish_non_exhaustive()
    }
}

impl Default for ClockSyncEstimator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ClockSyncEstimator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Local time in epoch milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Take `samples` sequential round trips and average the offsets.
    ///
    /// Per sample: `rtd = recv - send`, `estimated = server + rtd / 2`,
    /// `offset = estimated - recv`.
    pub async fn compute<S: ServerTimeSource>(
        &self,
        source: &S,
        samples: usize,
    ) -> Result<ClockOffset, CoreError> {
        if samples == 0 {
            return Err(CoreError::validation(
                "samples",
                "at least one sample is required",
            ));
        }

        let mut sum = 0.0;
        for index in 0..samples {
            let send = self.clock.now_ms();
            let server = source
                .server_time()
                .await
                .map_err(|e| CoreError::ClockSync {
                    sample: index + 1,
                    total: samples,
                    source: Box::new(e),
                })?;
            let recv = self.clock.now_ms();

            let rtd = recv - send;
            let estimated = server + rtd / 2.0;
            sum += estimated - recv;
        }

        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let offset_ms = sum / samples as f64;
        debug!(offset_ms, samples, "clock offset computed");

        Ok(ClockOffset {
            offset_ms,
            computed_at: Some(Utc::now()),
            sample_count: samples,
            computed: true,
            measured_at: Some(Instant::now()),
        })
    }

    /// `localNow + offset`.
    pub fn estimate_server_time(&self, offset_ms: f64) -> f64 {
        self.clock.now_ms() + offset_ms
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;

    /// Returns pre-scripted local timestamps in order.
    struct ScriptedClock(Mutex<VecDeque<f64>>);

    impl ScriptedClock {
        fn new(times: &[f64]) -> Self {
            Self(Mutex::new(times.iter().copied().collect()))
        }
    }

    impl Clock for ScriptedClock {
        fn now_ms(&self) -> f64 {
            self.0.lock().unwrap().pop_front().unwrap()
        }
    }

    /// Replays server times; `None` entries fail.
    struct ScriptedServer {
        replies: Mutex<VecDeque<Option<f64>>>,
        calls: AtomicUsize,
    }

    impl ScriptedServer {
        fn new(replies: &[Option<f64>]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ServerTimeSource for ScriptedServer {
        fn server_time(&self) -> impl Future<Output = Result<f64, CoreError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.replies.lock().unwrap().pop_front().flatten();
            async move {
                reply.ok_or(CoreError::Timeout {
                    endpoint: "servertime".into(),
                    timeout_ms: 5_000,
                })
            }
        }
    }

    #[tokio::test]
    async fn offset_is_mean_of_round_trip_samples() {
        let t = 1_000_000.0;
        let clock = ScriptedClock::new(&[1000.0, 1020.0, 1100.0, 1120.0, 1200.0, 1220.0]);
        let server = ScriptedServer::new(&[Some(t), Some(t + 5.0), Some(t + 10.0)]);
        let estimator = ClockSyncEstimator::new(Arc::new(clock));

        let offset = estimator.compute(&server, 3).await.unwrap();

        // (998_990 + 998_895 + 998_800) / 3
        assert_eq!(offset.offset_ms, 998_895.0);
        assert_eq!(offset.sample_count, 3);
        assert!(offset.computed);
        assert_eq!(server.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_sample_aborts_without_offset() {
        let clock = ScriptedClock::new(&[0.0; 8]);
        let server = ScriptedServer::new(&[Some(10.0), None, Some(30.0)]);
        let estimator = ClockSyncEstimator::new(Arc::new(clock));

        let err = estimator.compute(&server, 3).await.unwrap_err();

        assert!(matches!(err, CoreError::ClockSync { sample: 2, total: 3, .. }));
        assert!(err.is_timeout());
        assert_eq!(server.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_samples_is_rejected_before_any_call() {
        let server = ScriptedServer::new(&[]);
        let estimator = ClockSyncEstimator::new(Arc::new(ScriptedClock::new(&[])));

        let err = estimator.compute(&server, 0).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert_eq!(server.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn never_computed_offset_is_not_fresh() {
        let offset = ClockOffset::default();
        assert!(!offset.computed);
        assert!(!offset.is_fresh(Duration::from_secs(600)));
    }
}
