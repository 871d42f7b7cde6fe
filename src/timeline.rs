use itertools::Itertools;

use crate::step::{Step, StepKind};

/// Maximum number of upcoming steps shown after the active one
pub const QUEUE_LEN: usize = 3;

pub const COMPLETE_TEXT: &str = "session complete";
pub const COMPLETE_CATEGORY: &str = "complete";
pub const COMPLETE_ID: &str = "session-complete";

/// What the cook should be doing right now, and what comes after
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextAction {
    pub now_seconds: u64,
    pub active: Step,
    pub queue: Vec<Step>,
    /// Set only when `active` was synthesized because no step remains
    pub complete: bool,
}

impl NextAction {
    /// True when every step is behind us and `active` is the synthesized terminal step
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The active step hasn't begun yet (shown as focal action ahead of time)
    pub fn is_pending(&self) -> bool {
        !self.active.has_started(self.now_seconds)
    }

    /// Seconds until the active step starts, or remaining in its window once started
    pub fn countdown(&self) -> Option<u64> {
        if self.is_pending() {
            Some(self.active.start_offset - self.now_seconds)
        } else {
            self.active.remaining_at(self.now_seconds)
        }
    }
}

fn terminal_step(now: u64) -> Step {
    Step::new(COMPLETE_ID, now, None, StepKind::End, COMPLETE_TEXT).with_category(COMPLETE_CATEGORY)
}

/// Resolve the active step and look-ahead queue for `now`.
///
/// The first step (in sequence order) whose window contains `now` wins. With
/// nothing in window, the earliest upcoming step is shown instead; with nothing
/// left at all a terminal step is synthesized.
pub fn resolve(steps: &[Step], now: u64) -> NextAction {
    let upcoming = steps
        .iter()
        .filter(|step| !step.has_started(now))
        .sorted_by_key(|step| step.start_offset)
        .collect::<Vec<&Step>>();

    let found = steps
        .iter()
        .find(|step| step.is_in_window(now))
        .or_else(|| upcoming.first().copied())
        .cloned();
    let complete = found.is_none();
    let active = found.unwrap_or_else(|| terminal_step(now));

    let queue = upcoming.into_iter().take(QUEUE_LEN).cloned().collect();

    NextAction {
        now_seconds: now,
        active,
        queue,
        complete,
    }
}
