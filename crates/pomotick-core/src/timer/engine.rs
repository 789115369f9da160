//! Timer implementation.
//!
//! The timer is a wall-clock-based state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` roughly once per
//! second.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped --start--> Running --pause--> Paused --resume--> Running
//! Running --(target reached)--> Stopped   (emits TimerCompleted)
//! any state --reset--> Stopped
//! ```
//!
//! Elapsed time is always recomputed from the wall-clock anchor, never
//! accumulated per tick. A delayed or missed tick (the host process being
//! suspended, say) therefore never drifts: the next tick reads the true
//! elapsed time straight off the anchor.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Stopped,
    Running,
    Paused,
}

/// Pausable, resumable elapsed-time stopwatch with a fixed target duration.
///
/// Serializable so a host can persist it between invocations; the anchor is
/// stored as epoch milliseconds and survives a round-trip, which keeps a
/// running timer accurate across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    /// Target duration in milliseconds. Set on every start.
    target_ms: u64,
    /// Elapsed time in milliseconds, recomputed from the anchor while
    /// running, frozen while paused.
    elapsed_ms: u64,
    state: TimerState,
    /// Wall-clock anchor (ms since epoch) from which elapsed time is
    /// computed by subtraction. `None` unless running.
    #[serde(default)]
    anchor_epoch_ms: Option<u64>,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            target_ms: 0,
            elapsed_ms: 0,
            state: TimerState::Stopped,
            anchor_epoch_ms: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_ms / 1000
    }

    pub fn target_secs(&self) -> u64 {
        self.target_ms / 1000
    }

    /// Remaining time in whole seconds, floored at 0 -- never negative even
    /// if elapsed overshoots the target between ticks.
    pub fn remaining_secs(&self) -> u64 {
        self.target_ms.saturating_sub(self.elapsed_ms) / 1000
    }

    /// Elapsed time formatted as `HH:MM:SS`.
    pub fn elapsed_hms(&self) -> String {
        format_hms(self.elapsed_secs())
    }

    /// Remaining time formatted as `HH:MM:SS`.
    pub fn remaining_hms(&self) -> String {
        format_hms(self.remaining_secs())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm the timer with a fresh target and start running.
    ///
    /// From `Paused` this behaves as a resume: the elapsed time frozen at
    /// pause is preserved and accrual continues from the wall clock (the
    /// resume-via-start path for callers that don't distinguish the two).
    /// From `Stopped` it starts fresh. Calling `start` while already
    /// `Running` deliberately re-arms the timer -- fresh anchor, elapsed
    /// back to 0 -- which the CLI exposes as an explicit restart.
    pub fn start(&mut self, duration_min: u32) -> Vec<Event> {
        self.start_at(duration_min, now_ms())
    }

    pub(crate) fn start_at(&mut self, duration_min: u32, now: u64) -> Vec<Event> {
        self.target_ms = u64::from(duration_min).saturating_mul(60_000);

        match self.state {
            TimerState::Paused => {
                // Continue from the frozen elapsed value.
                self.anchor_epoch_ms = Some(now.saturating_sub(self.elapsed_ms));
            }
            TimerState::Stopped | TimerState::Running => {
                self.anchor_epoch_ms = Some(now);
                self.elapsed_ms = 0;
            }
        }

        self.state = TimerState::Running;
        vec![Event::TimerStateChanged {
            state: self.state,
            at: Utc::now(),
        }]
    }

    /// Freeze elapsed time. No-op unless `Running`.
    pub fn pause(&mut self) -> Vec<Event> {
        self.pause_at(now_ms())
    }

    pub(crate) fn pause_at(&mut self, now: u64) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        self.flush_elapsed(now);
        self.anchor_epoch_ms = None;
        self.state = TimerState::Paused;
        vec![Event::TimerStateChanged {
            state: self.state,
            at: Utc::now(),
        }]
    }

    /// Continue accruing from the frozen elapsed value. No-op unless `Paused`.
    pub fn resume(&mut self) -> Vec<Event> {
        self.resume_at(now_ms())
    }

    pub(crate) fn resume_at(&mut self, now: u64) -> Vec<Event> {
        if self.state != TimerState::Paused {
            return Vec::new();
        }
        // Restore the anchor so elapsed computation continues seamlessly.
        self.anchor_epoch_ms = Some(now.saturating_sub(self.elapsed_ms));
        self.state = TimerState::Running;
        vec![Event::TimerStateChanged {
            state: self.state,
            at: Utc::now(),
        }]
    }

    /// Stop unconditionally, clear elapsed time and anchors.
    ///
    /// Emits the stopped-state change followed by a zero tick so displays
    /// blank out without polling.
    pub fn reset(&mut self) -> Vec<Event> {
        self.state = TimerState::Stopped;
        self.elapsed_ms = 0;
        self.anchor_epoch_ms = None;
        vec![
            Event::TimerStateChanged {
                state: self.state,
                at: Utc::now(),
            },
            Event::TimerTick {
                elapsed_secs: 0,
                at: Utc::now(),
            },
        ]
    }

    /// Call roughly once per second while running.
    ///
    /// Recomputes elapsed time from the anchor and emits a tick. When the
    /// target is reached the timer stops and the returned events are exactly
    /// `[TimerTick, TimerStateChanged(stopped), TimerCompleted]`, in that
    /// order. Not running: returns no events.
    pub fn tick(&mut self) -> Vec<Event> {
        self.tick_at(now_ms())
    }

    pub(crate) fn tick_at(&mut self, now: u64) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        self.flush_elapsed(now);

        let mut events = vec![Event::TimerTick {
            elapsed_secs: self.elapsed_secs(),
            at: Utc::now(),
        }];

        if self.elapsed_ms >= self.target_ms {
            self.state = TimerState::Stopped;
            self.anchor_epoch_ms = None;
            events.push(Event::TimerStateChanged {
                state: self.state,
                at: Utc::now(),
            });
            events.push(Event::TimerCompleted { at: Utc::now() });
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn flush_elapsed(&mut self, now: u64) {
        if let Some(anchor) = self.anchor_epoch_ms {
            // max() keeps elapsed monotonically non-decreasing even if the
            // wall clock steps backwards between ticks.
            self.elapsed_ms = self.elapsed_ms.max(now.saturating_sub(anchor));
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a second count as `HH:MM:SS`.
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn states(events: &[Event]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match e {
                Event::TimerTick { .. } => "tick",
                Event::TimerStateChanged { .. } => "state",
                Event::TimerCompleted { .. } => "completed",
                _ => "other",
            })
            .collect()
    }

    #[test]
    fn start_pause_resume_transitions() {
        let mut timer = Timer::new();
        assert_eq!(timer.state(), TimerState::Stopped);

        assert_eq!(timer.start_at(25, 0).len(), 1);
        assert_eq!(timer.state(), TimerState::Running);

        assert_eq!(timer.pause_at(1_000).len(), 1);
        assert_eq!(timer.state(), TimerState::Paused);

        assert_eq!(timer.resume_at(2_000).len(), 1);
        assert_eq!(timer.state(), TimerState::Running);
    }

    #[test]
    fn pause_is_noop_unless_running() {
        let mut timer = Timer::new();
        assert!(timer.pause_at(0).is_empty());
        timer.start_at(1, 0);
        timer.pause_at(500);
        assert!(timer.pause_at(600).is_empty());
    }

    #[test]
    fn resume_is_noop_unless_paused() {
        let mut timer = Timer::new();
        assert!(timer.resume_at(0).is_empty());
        timer.start_at(1, 0);
        assert!(timer.resume_at(500).is_empty());
    }

    #[test]
    fn elapsed_tracks_wall_clock_from_anchor() {
        let mut timer = Timer::new();
        timer.start_at(25, 10_000);
        timer.tick_at(15_000);
        assert_eq!(timer.elapsed_secs(), 5);
        // A late tick recomputes from the anchor, no drift accumulates.
        timer.tick_at(70_000);
        assert_eq!(timer.elapsed_secs(), 60);
    }

    #[test]
    fn pause_resume_preserves_elapsed_excluding_paused_time() {
        let mut timer = Timer::new();
        timer.start_at(25, 0);
        timer.tick_at(5_000);
        timer.pause_at(7_000);
        assert_eq!(timer.elapsed_secs(), 7);

        // A long paused stretch must not count.
        timer.resume_at(100_000);
        timer.tick_at(103_000);
        assert_eq!(timer.elapsed_secs(), 10);
    }

    #[test]
    fn start_from_paused_resumes_with_new_target() {
        let mut timer = Timer::new();
        timer.start_at(25, 0);
        timer.pause_at(60_000);
        timer.start_at(5, 90_000);
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.target_secs(), 5 * 60);
        timer.tick_at(91_000);
        assert_eq!(timer.elapsed_secs(), 61);
    }

    #[test]
    fn start_while_running_rearms() {
        let mut timer = Timer::new();
        timer.start_at(25, 0);
        timer.tick_at(120_000);
        assert_eq!(timer.elapsed_secs(), 120);
        timer.start_at(25, 300_000);
        assert_eq!(timer.elapsed_secs(), 0);
        timer.tick_at(301_000);
        assert_eq!(timer.elapsed_secs(), 1);
    }

    #[test]
    fn completion_event_order_is_tick_stopped_completed() {
        let mut timer = Timer::new();
        timer.start_at(1, 0);
        assert!(states(&timer.tick_at(30_000)) == vec!["tick"]);

        let events = timer.tick_at(60_000);
        assert_eq!(states(&events), vec!["tick", "state", "completed"]);
        match &events[1] {
            Event::TimerStateChanged { state, .. } => assert_eq!(*state, TimerState::Stopped),
            other => panic!("expected state change, got {other:?}"),
        }
        assert_eq!(timer.state(), TimerState::Stopped);

        // Completion fires exactly once.
        assert!(timer.tick_at(61_000).is_empty());
    }

    #[test]
    fn remaining_floors_at_zero_on_overshoot() {
        let mut timer = Timer::new();
        timer.start_at(1, 0);
        timer.tick_at(90_000);
        assert_eq!(timer.remaining_secs(), 0);
        assert_eq!(timer.remaining_hms(), "00:00:00");
    }

    #[test]
    fn reset_emits_stopped_then_zero_tick_and_is_idempotent() {
        let mut timer = Timer::new();
        timer.start_at(25, 0);
        timer.tick_at(5_000);

        let events = timer.reset();
        assert_eq!(states(&events), vec!["state", "tick"]);
        match &events[1] {
            Event::TimerTick { elapsed_secs, .. } => assert_eq!(*elapsed_secs, 0),
            other => panic!("expected tick, got {other:?}"),
        }
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.elapsed_secs(), 0);

        timer.reset();
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.elapsed_secs(), 0);
    }

    #[test]
    fn zero_duration_completes_on_first_tick() {
        let mut timer = Timer::new();
        timer.start_at(0, 0);
        let events = timer.tick_at(0);
        assert_eq!(states(&events), vec!["tick", "state", "completed"]);
    }

    #[test]
    fn format_hms_pads_fields() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(25 * 60), "00:25:00");
        assert_eq!(format_hms(3661), "01:01:01");
        assert_eq!(format_hms(25 * 3600), "25:00:00");
    }

    #[test]
    fn serde_round_trip_preserves_running_anchor() {
        let mut timer = Timer::new();
        timer.start_at(25, 10_000);
        let json = serde_json::to_string(&timer).unwrap();
        let mut restored: Timer = serde_json::from_str(&json).unwrap();
        restored.tick_at(25_000);
        assert_eq!(restored.elapsed_secs(), 15);
        assert_eq!(restored.state(), TimerState::Running);
    }

    proptest! {
        /// Elapsed never decreases and remaining never underflows, for any
        /// sequence of tick times.
        #[test]
        fn elapsed_monotonic_remaining_floored(mut ticks in proptest::collection::vec(0u64..10_000_000, 1..40)) {
            let mut timer = Timer::new();
            timer.start_at(25, 0);
            let mut last = 0;
            for now in ticks.drain(..) {
                timer.tick_at(now);
                prop_assert!(timer.elapsed_secs() >= last);
                last = timer.elapsed_secs();
                prop_assert!(timer.remaining_secs() <= timer.target_secs());
            }
        }
    }
}
