//! Session rotation state machine.
//!
//! The [`SessionManager`] owns the [`Timer`] and drives the Pomodoro cycle:
//! it starts the timer for the current session type, and when the timer
//! completes it advances the work -> short break -> long break rotation and
//! auto-starts the next session with no idle gap. Downstream consumers
//! (storage, display, notification) observe the republished events.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::engine::{now_ms, Timer};
use crate::events::{Event, EventBus};
use crate::notify::NotificationSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    /// Stable string form, used for database rows and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::ShortBreak => "short_break",
            SessionType::LongBreak => "long_break",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings snapshot driving session durations and the long-break cadence.
///
/// Durations are whole minutes. The snapshot is read at `start_next_session`
/// time only, so replacing it mid-session never disturbs the session in
/// progress. Values are validated at the configuration boundary
/// ([`crate::Config::settings`]); the state machine itself assumes they are
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_before_long_break: u32,
    pub sound_enabled: bool,
}

impl Settings {
    pub fn duration_min(&self, session_type: SessionType) -> u32 {
        match session_type {
            SessionType::Work => self.work_duration,
            SessionType::ShortBreak => self.short_break_duration,
            SessionType::LongBreak => self.long_break_duration,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            sessions_before_long_break: 4,
            sound_enabled: true,
        }
    }
}

/// The cycle state machine.
///
/// Owns exactly one [`Timer`] for its whole lifetime. Serializable so a host
/// can persist it between invocations; the event bus and notification sink
/// are runtime attachments and are re-registered after deserialization.
#[derive(Serialize, Deserialize)]
pub struct SessionManager {
    timer: Timer,
    current_session_type: SessionType,
    /// Completed work sessions since the last long break. Resets to 0
    /// whenever it triggers a long break.
    completed_work_sessions: u32,
    settings: Settings,
    #[serde(skip)]
    bus: EventBus,
    #[serde(skip)]
    notifier: Option<Box<dyn NotificationSink>>,
}

impl SessionManager {
    pub fn new(settings: Settings) -> Self {
        Self {
            timer: Timer::new(),
            current_session_type: SessionType::Work,
            completed_work_sessions: 0,
            settings,
            bus: EventBus::new(),
            notifier: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn current_session_type(&self) -> SessionType {
        self.current_session_type
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.timer.state(),
            session_type: self.current_session_type,
            elapsed_secs: self.timer.elapsed_secs(),
            remaining_secs: self.timer.remaining_secs(),
            target_secs: self.timer.target_secs(),
            completed_work_sessions: self.completed_work_sessions,
            at: Utc::now(),
        }
    }

    // ── Wiring ───────────────────────────────────────────────────────

    /// Register an event listener. All events produced by this manager are
    /// delivered synchronously, in emission order.
    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.bus.subscribe(listener);
    }

    /// Attach the completion-alarm capability. Without one, completions are
    /// silent.
    pub fn set_notifier(&mut self, notifier: Box<dyn NotificationSink>) {
        self.notifier = Some(notifier);
    }

    /// Swap in a fresh settings snapshot.
    ///
    /// Never interrupts a session in progress: durations are only read at
    /// `start_next_session` time, so the new values take effect on the next
    /// session.
    pub fn reload_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the session for the current session type.
    ///
    /// The sole entry point for starting any session, initial or
    /// rotation-advanced. Looks up the duration from the settings snapshot,
    /// arms the timer and emits `SessionChanged`.
    pub fn start_next_session(&mut self) -> Vec<Event> {
        let events = self.begin_session_at(now_ms());
        self.bus.publish_all(&events);
        events
    }

    #[cfg(test)]
    pub(crate) fn start_next_session_at(&mut self, now: u64) -> Vec<Event> {
        let events = self.begin_session_at(now);
        self.bus.publish_all(&events);
        events
    }

    pub fn pause(&mut self) -> Vec<Event> {
        let events = self.timer.pause();
        self.bus.publish_all(&events);
        events
    }

    pub fn resume(&mut self) -> Vec<Event> {
        let events = self.timer.resume();
        self.bus.publish_all(&events);
        events
    }

    /// Drive the owned timer. Call roughly once per second.
    ///
    /// When the timer completes, the full cascade runs synchronously within
    /// this call: alarm, rotation bookkeeping, `SessionCompleted`, and the
    /// auto-start of the next session.
    pub fn tick(&mut self) -> Vec<Event> {
        self.tick_at(now_ms())
    }

    pub(crate) fn tick_at(&mut self, now: u64) -> Vec<Event> {
        let mut events = self.timer.tick_at(now);
        if events
            .iter()
            .any(|e| matches!(e, Event::TimerCompleted { .. }))
        {
            events.extend(self.on_timer_completed_at(now));
        }
        self.bus.publish_all(&events);
        events
    }

    /// Abandon whatever is in progress and return to the initial state:
    /// timer stopped, session type `Work`, rotation counter 0.
    ///
    /// Emits no `SessionCompleted` -- from the rotation's point of view the
    /// in-flight session silently never happened. A caller that wants a
    /// partial record persisted must do so before resetting.
    pub fn reset(&mut self) -> Vec<Event> {
        let events = self.timer.reset();
        self.current_session_type = SessionType::Work;
        self.completed_work_sessions = 0;
        self.bus.publish_all(&events);
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_session_at(&mut self, now: u64) -> Vec<Event> {
        let duration_min = self.settings.duration_min(self.current_session_type);
        let mut events = self.timer.start_at(duration_min, now);
        events.push(Event::SessionChanged {
            session_type: self.current_session_type,
            duration_min,
            at: Utc::now(),
        });
        events
    }

    fn on_timer_completed_at(&mut self, now: u64) -> Vec<Event> {
        if self.settings.sound_enabled {
            if let Some(notifier) = self.notifier.as_mut() {
                // A failed alarm must never block the rotation.
                if let Err(e) = notifier.play_completion() {
                    tracing::warn!("completion sound failed: {e}");
                }
            }
        }

        let completed_type = self.current_session_type;
        self.current_session_type = match completed_type {
            SessionType::Work => {
                self.completed_work_sessions += 1;
                if self.completed_work_sessions >= self.settings.sessions_before_long_break {
                    self.completed_work_sessions = 0;
                    SessionType::LongBreak
                } else {
                    SessionType::ShortBreak
                }
            }
            // Break length never affects rotation counting.
            SessionType::ShortBreak | SessionType::LongBreak => SessionType::Work,
        };

        let mut events = vec![Event::SessionCompleted {
            session_type: completed_type,
            at: Utc::now(),
        }];
        events.extend(self.begin_session_at(now));
        events
    }
}
