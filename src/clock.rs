use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of "now" in milliseconds. Only differences between readings matter.
pub trait TimeSource {
    fn now_ms(&self) -> u64;
}

/// Production time source backed by a monotonic `Instant`
#[derive(Clone, Copy, Debug)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced time source for tests and headless runs.
/// Clones share the same reading.
#[derive(Clone, Debug, Default)]
pub struct ManualTime {
    now: Arc<AtomicU64>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockState {
    pub paused_accumulated_ms: u64,
    pub running_since_ms: Option<u64>,
}

/// Elapsed session time, net of paused intervals
#[derive(Debug, Clone)]
pub struct Clock<T: TimeSource = MonotonicTime> {
    state: ClockState,
    time: T,
}

impl<T: TimeSource> Clock<T> {
    pub fn new(time: T) -> Self {
        Self {
            state: ClockState::default(),
            time,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running_since_ms.is_some()
    }

    pub fn start(&mut self) {
        if self.state.running_since_ms.is_none() {
            self.state.running_since_ms = Some(self.time.now_ms());
        }
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.state.running_since_ms.take() {
            let ran = self.time.now_ms().saturating_sub(since);
            self.state.paused_accumulated_ms = self.state.paused_accumulated_ms.saturating_add(ran);
        }
    }

    pub fn reset(&mut self) {
        self.state = ClockState::default();
    }

    pub fn elapsed(&self) -> u64 {
        let running = self
            .state
            .running_since_ms
            .map_or(0, |since| self.time.now_ms().saturating_sub(since));
        self.state.paused_accumulated_ms + running
    }

    /// Elapsed time floored to whole seconds
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed() / 1000
    }
}

/// Display-side counter that advances optimistically each tick and snaps
/// back to the true elapsed value once it strays past `threshold_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftCorrector {
    shown_ms: u64,
    threshold_ms: u64,
}

impl DriftCorrector {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            shown_ms: 0,
            threshold_ms,
        }
    }

    pub fn shown_ms(&self) -> u64 {
        self.shown_ms
    }

    pub fn shown_secs(&self) -> u64 {
        self.shown_ms / 1000
    }

    /// Advance by one tick. Returns true when the counter was resynchronised.
    pub fn on_tick(&mut self, step_ms: u64, true_elapsed_ms: u64) -> bool {
        self.shown_ms = self.shown_ms.saturating_add(step_ms);
        self.sync(true_elapsed_ms)
    }

    /// Snap to the true value if the drift exceeds the threshold
    pub fn sync(&mut self, true_elapsed_ms: u64) -> bool {
        if self.shown_ms.abs_diff(true_elapsed_ms) > self.threshold_ms {
            self.shown_ms = true_elapsed_ms;
            true
        } else {
            false
        }
    }

    /// Unconditionally adopt the true value (used on transitions)
    pub fn snap(&mut self, true_elapsed_ms: u64) {
        self.shown_ms = true_elapsed_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_clock_reads_zero() {
        let time = ManualTime::new();
        time.set(5_000);
        let clock = Clock::new(time);
        assert_eq!(clock.elapsed(), 0);
        assert!(!clock.is_running());
    }

    #[test]
    fn pause_resume_excludes_paused_interval() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());

        clock.start();
        time.set(10_000);
        clock.pause();
        time.set(15_000);
        clock.start();
        time.set(20_000);

        assert_eq!(clock.elapsed(), 15_000);
    }

    #[test]
    fn elapsed_never_decreases_and_freezes_while_paused() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        let mut readings = Vec::new();

        clock.start();
        time.advance(1_000);
        readings.push(clock.elapsed());
        time.advance(1_000);
        readings.push(clock.elapsed());
        clock.pause();
        let at_pause = clock.elapsed();
        for _ in 0..3 {
            time.advance(1_000);
            assert_eq!(clock.elapsed(), at_pause);
        }
        clock.start();
        time.advance(1_000);
        readings.push(clock.elapsed());

        assert!(readings.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(readings, vec![1_000, 2_000, 3_000]);
    }

    #[test]
    fn start_while_running_keeps_original_origin() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        clock.start();
        time.advance(4_000);
        clock.start();
        time.advance(1_000);
        assert_eq!(clock.elapsed(), 5_000);
    }

    #[test]
    fn pause_while_stopped_is_noop() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        time.advance(3_000);
        clock.pause();
        assert_eq!(clock.state(), ClockState::default());
    }

    #[test]
    fn reset_clears_state() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        clock.start();
        time.advance(2_500);
        clock.pause();
        clock.start();
        clock.reset();
        assert_eq!(clock.state(), ClockState::default());
        assert_eq!(clock.elapsed(), 0);
    }

    #[test]
    fn elapsed_secs_floors() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        clock.start();
        time.advance(1_999);
        assert_eq!(clock.elapsed_secs(), 1);
    }

    #[test]
    fn drift_within_threshold_is_kept() {
        let mut display = DriftCorrector::new(250);
        assert!(!display.on_tick(1_000, 1_200));
        assert_eq!(display.shown_ms(), 1_000);
    }

    #[test]
    fn drift_past_threshold_resyncs() {
        let mut display = DriftCorrector::new(250);
        display.on_tick(1_000, 1_000);
        // Paused: true value stays put while the counter runs ahead
        assert!(display.on_tick(1_000, 1_000));
        assert_eq!(display.shown_ms(), 1_000);
        assert_eq!(display.shown_secs(), 1);
    }

    #[test]
    fn snap_adopts_true_value() {
        let mut display = DriftCorrector::new(250);
        display.on_tick(1_000, 1_100);
        display.snap(0);
        assert_eq!(display.shown_ms(), 0);
    }
}
