use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{SessionType, TimerState};

/// Every state change in the system produces an Event.
///
/// Events are emitted synchronously and in a fixed order. Within a single
/// completing tick the sequence is:
///
/// ```text
/// TimerTick -> TimerStateChanged(stopped) -> TimerCompleted
///   -> SessionCompleted -> TimerStateChanged(running) -> SessionChanged
/// ```
///
/// Listeners rely on this ordering (e.g. to read "session just ended"
/// context before reacting to completion), so no event is ever reordered or
/// dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Elapsed time advanced. Emitted once per tick while running, and once
    /// with `elapsed_secs: 0` on reset.
    TimerTick {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStateChanged {
        state: TimerState,
        at: DateTime<Utc>,
    },
    /// The timer reached its target duration. Always follows the
    /// stopped-state change, never precedes it.
    TimerCompleted {
        at: DateTime<Utc>,
    },
    /// A new session began.
    SessionChanged {
        session_type: SessionType,
        duration_min: u32,
        at: DateTime<Utc>,
    },
    /// A session ran to completion. Carries the type that just finished,
    /// not the upcoming one.
    SessionCompleted {
        session_type: SessionType,
        at: DateTime<Utc>,
    },
    /// Full state snapshot for pollers (e.g. the CLI `status` command).
    StateSnapshot {
        state: TimerState,
        session_type: SessionType,
        elapsed_secs: u64,
        remaining_secs: u64,
        target_secs: u64,
        completed_work_sessions: u32,
        at: DateTime<Utc>,
    },
}

/// Synchronous listener registry.
///
/// Replaces the signal/slot wiring of a GUI toolkit: listeners are plain
/// closures, invoked in registration order on the caller's thread. Dispatch
/// happens inline with the operation that produced the event, so no other
/// tick or public call can interleave mid-sequence.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn FnMut(&Event)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners cannot be unregistered; they live as
    /// long as the bus.
    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Notify all listeners, in registration order.
    pub fn publish(&mut self, event: &Event) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    pub fn publish_all(&mut self, events: &[Event]) {
        for event in events {
            self.publish(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
