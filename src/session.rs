use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use crate::clock::{Clock, ClockState, MonotonicTime, TimeSource};
use crate::recipe::Recipe;
use crate::step::Step;
use crate::timeline::{resolve, NextAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub dish_name: String,
    pub total_seconds: u64,
    pub started_at: Option<DateTime<Local>>,
    pub status: SessionStatus,
}

/// Work for the capture/voice-output collaborator, produced by a transition
/// and carried out by the caller off the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    StartCapture {
        session_id: String,
        timeline: Vec<Step>,
    },
    StopCapture,
}

/// Published to observers after every recomputation
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub status: SessionStatus,
    pub elapsed_ms: u64,
    pub next: NextAction,
}

static LAST_ID_SECS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Session ids follow the backend's `session_<unix seconds>` convention.
/// Ids handed out within the same second are bumped forward so no two
/// sessions in this process share one.
pub fn new_session_id() -> String {
    let now = Utc::now().timestamp();
    let prev = LAST_ID_SECS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or(now);
    format!("session_{}", now.max(prev.saturating_add(1)))
}

/// Lifecycle controller for one cooking session: idle → running ⇄ paused → completed.
///
/// Owns the clock and the (immutable) step sequence. Every transition and
/// every tick while running recomputes the next action from scratch.
/// Invalid transitions are silent no-ops.
#[derive(Debug)]
pub struct Session<T: TimeSource = MonotonicTime> {
    summary: SessionSummary,
    steps: Vec<Step>,
    clock: Clock<T>,
    next: NextAction,
    observers: Vec<Sender<SessionUpdate>>,
}

impl<T: TimeSource> Session<T> {
    pub fn new(
        id: impl Into<String>,
        dish_name: impl Into<String>,
        total_seconds: u64,
        steps: Vec<Step>,
        time: T,
    ) -> Self {
        let clock = Clock::new(time);
        let next = resolve(&steps, clock.elapsed_secs());
        Self {
            summary: SessionSummary {
                id: id.into(),
                dish_name: dish_name.into(),
                total_seconds,
                started_at: None,
                status: SessionStatus::Idle,
            },
            steps,
            clock,
            next,
            observers: Vec::new(),
        }
    }

    pub fn from_recipe(recipe: &Recipe, time: T) -> Self {
        Self::new(
            new_session_id(),
            recipe.name.clone(),
            recipe.total_seconds(),
            recipe.timeline.clone(),
            time,
        )
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    pub fn status(&self) -> SessionStatus {
        self.summary.status
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn next_action(&self) -> &NextAction {
        &self.next
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.elapsed()
    }

    /// A session counts as active while it can still be paused or ended
    pub fn is_active(&self) -> bool {
        matches!(
            self.summary.status,
            SessionStatus::Running | SessionStatus::Paused
        )
    }

    pub fn subscribe(&mut self) -> Receiver<SessionUpdate> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.update());
        self.observers.push(tx);
        rx
    }

    /// Start from idle or resume from paused.
    /// Returns the capture signal only for the very first start.
    pub fn start(&mut self) -> Option<Signal> {
        match self.summary.status {
            SessionStatus::Idle => {
                if self.summary.started_at.is_none() {
                    self.summary.started_at = Some(Local::now());
                }
                self.clock.start();
                self.transition(SessionStatus::Running);
                Some(Signal::StartCapture {
                    session_id: self.summary.id.clone(),
                    timeline: self.steps.clone(),
                })
            }
            SessionStatus::Paused => {
                self.clock.start();
                self.transition(SessionStatus::Running);
                None
            }
            SessionStatus::Running | SessionStatus::Completed => None,
        }
    }

    /// Pause a running session. Capture keeps going in the background.
    pub fn pause(&mut self) -> bool {
        if self.summary.status != SessionStatus::Running {
            return false;
        }
        self.clock.pause();
        self.transition(SessionStatus::Paused);
        true
    }

    /// Finish a running or paused session
    pub fn end(&mut self) -> Option<Signal> {
        if !self.is_active() {
            return None;
        }
        self.clock.reset();
        self.transition(SessionStatus::Completed);
        Some(Signal::StopCapture)
    }

    /// Periodic tick; recomputes only while running. Returns true if recomputed.
    pub fn tick(&mut self) -> bool {
        if self.summary.status != SessionStatus::Running {
            return false;
        }
        self.recompute();
        true
    }

    fn transition(&mut self, to: SessionStatus) {
        log::info!(
            "session {}: {} -> {} at {}ms",
            self.summary.id,
            self.summary.status,
            to,
            self.clock.elapsed()
        );
        self.summary.status = to;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.next = resolve(&self.steps, self.clock.elapsed_secs());
        let update = self.update();
        self.observers
            .retain(|observer| observer.send(update.clone()).is_ok());
    }

    fn update(&self) -> SessionUpdate {
        SessionUpdate {
            status: self.summary.status,
            elapsed_ms: self.clock.elapsed(),
            next: self.next.clone(),
        }
    }
}
