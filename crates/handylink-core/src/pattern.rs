// ── Timed pattern execution ──
//
// A pattern is a list of commands with offsets from the start of the run.
// One driver task fires them in order; each step fires at its offset
// whether or not the previous one succeeded. At most one run is active
// per session, and any new caller command cancels it.
//
// Steps share the session lock and wait for their own vendor calls, so a
// slow step pushes back the steps after it. Late steps still fire.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use strum::{Display, EnumString};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::dispatch::Origin;
use crate::model::SlideRange;
use crate::session::SessionInner;

const VELOCITY_STEP: u8 = 20;
const SLOW_FLOOR: u8 = 10;
const DEFAULT_VELOCITY: u8 = 50;
/// Steps starting later than this past their offset are logged.
const LATE_STEP_THRESHOLD: Duration = Duration::from_millis(250);

// ── Patterns ─────────────────────────────────────────────────────

/// Built-in patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Pattern {
    /// Ramp up, pause, resume.
    Edge,
    /// Current velocity + 20, capped at 100.
    Speed,
    /// Current velocity - 20, floored at 10.
    Slow,
    /// Full stroke, velocity 50, start.
    Default,
}

/// One scheduled command.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternStep {
    pub at: Duration,
    pub command: Command,
}

impl PatternStep {
    fn new(at_ms: u64, command: Command) -> Self {
        Self {
            at: Duration::from_millis(at_ms),
            command,
        }
    }
}

pub fn speed_up(current: u8) -> u8 {
    current.saturating_add(VELOCITY_STEP).min(100)
}

pub fn slow_down(current: u8) -> u8 {
    current.saturating_sub(VELOCITY_STEP).clamp(SLOW_FLOOR, 100)
}

impl Pattern {
    /// Steps for this pattern given the current velocity.
    pub fn plan(self, current_velocity: u8) -> Vec<PatternStep> {
        match self {
            Self::Edge => vec![
                PatternStep::new(0, Command::SetVelocity { velocity: 30 }),
                PatternStep::new(3_000, Command::SetVelocity { velocity: 70 }),
                PatternStep::new(5_000, Command::Stop),
                PatternStep::new(
                    7_000,
                    Command::Start {
                        velocity: Some(DEFAULT_VELOCITY),
                    },
                ),
            ],
            Self::Speed => vec![PatternStep::new(
                0,
                Command::SetVelocity {
                    velocity: speed_up(current_velocity),
                },
            )],
            Self::Slow => vec![PatternStep::new(
                0,
                Command::SetVelocity {
                    velocity: slow_down(current_velocity),
                },
            )],
            Self::Default => vec![
                PatternStep::new(
                    0,
                    Command::SetRange {
                        range: SlideRange::full(),
                    },
                ),
                PatternStep::new(
                    0,
                    Command::SetVelocity {
                        velocity: DEFAULT_VELOCITY,
                    },
                ),
                PatternStep::new(0, Command::Start { velocity: None }),
            ],
        }
    }

    /// The velocity this pattern settles on, if it sets one.
    fn target_velocity(steps: &[PatternStep]) -> Option<u8> {
        steps.iter().rev().find_map(|step| match step.command {
            Command::SetVelocity { velocity } => Some(velocity),
            Command::Start { velocity } => velocity,
            _ => None,
        })
    }
}

// ── Ticket ───────────────────────────────────────────────────────

/// Handle describing a scheduled run.
#[derive(Debug, Clone, Serialize)]
pub struct PatternTicket {
    pub pattern: Pattern,
    pub steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<u8>,
    /// Total scheduled span of the run in milliseconds.
    pub duration_ms: u64,
    #[serde(skip)]
    finished: CancellationToken,
}

impl PatternTicket {
    /// Wait until the run has fired its last step or was cancelled.
    pub async fn wait(&self) {
        self.finished.cancelled().await;
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }
}

// ── Executor ─────────────────────────────────────────────────────

struct PatternRun {
    id: u64,
    pattern: Pattern,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Holds the session's active pattern run.
#[derive(Default)]
pub struct PatternExecutor {
    active: Mutex<Option<PatternRun>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for PatternExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternExecutor")
            .field("active", &self.active_pattern())
            .finish_non_exhaustive()
    }
}

impl PatternExecutor {
    /// The pattern currently running, if any.
    pub fn active_pattern(&self) -> Option<Pattern> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active
            .as_ref()
            .filter(|run| !run.handle.is_finished())
            .map(|run| run.pattern)
    }

    /// Cancel the active run. Returns `true` if one was still running.
    pub fn cancel(&self) -> bool {
        let run = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match run {
            Some(run) if !run.handle.is_finished() => {
                run.cancel.cancel();
                debug!(run = run.id, pattern = %run.pattern, "pattern cancelled");
                true
            }
            _ => false,
        }
    }

    /// Spawn a driver for `steps`, replacing any active run.
    pub(crate) fn start(
        &self,
        session: Weak<SessionInner>,
        session_cancel: &CancellationToken,
        pattern: Pattern,
        steps: Vec<PatternStep>,
    ) -> PatternTicket {
        self.cancel();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = session_cancel.child_token();
        let finished = CancellationToken::new();
        let ticket = PatternTicket {
            pattern,
            steps: steps.len(),
            velocity: Pattern::target_velocity(&steps),
            duration_ms: steps
                .iter()
                .map(|s| u64::try_from(s.at.as_millis()).unwrap_or(u64::MAX))
                .max()
                .unwrap_or_default(),
            finished: finished.clone(),
        };

        info!(run = id, %pattern, steps = steps.len(), "pattern scheduled");
        let handle = tokio::spawn(drive(
            session,
            id,
            steps,
            cancel.clone(),
            finished.drop_guard(),
        ));

        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(PatternRun {
            id,
            pattern,
            cancel,
            handle,
        });
        ticket
    }
}

// ── Driver task ──────────────────────────────────────────────────

async fn drive(
    session: Weak<SessionInner>,
    run: u64,
    steps: Vec<PatternStep>,
    cancel: CancellationToken,
    _finished: DropGuard,
) {
    let started = Instant::now();

    for (index, step) in steps.into_iter().enumerate() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = sleep_until(started + step.at) => {}
        }

        let Some(inner) = session.upgrade() else {
            return;
        };
        let mut state = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            state = inner.state.lock() => state,
        };
        if cancel.is_cancelled() {
            return;
        }

        let kind = step.command.kind();
        let late = Instant::now().saturating_duration_since(started + step.at);
        if late > LATE_STEP_THRESHOLD {
            warn!(
                run,
                step = index,
                %kind,
                late_ms = u64::try_from(late.as_millis()).unwrap_or(u64::MAX),
                "pattern step firing late"
            );
        }
        match inner
            .dispatcher()
            .dispatch(&mut state, step.command, Origin::Pattern)
            .await
        {
            Ok(_) => debug!(run, step = index, %kind, "pattern step fired"),
            Err(e) => warn!(run, step = index, %kind, error = %e, "pattern step failed"),
        }
    }
}
