//! # Pomotick Core Library
//!
//! This library provides the core business logic for the Pomotick Pomodoro
//! timer: a wall-clock-anchored timer state machine, the work/break session
//! rotation, and SQLite-backed session history. The CLI binary is a thin
//! presentation layer over this library; it drives the timer's `tick()`,
//! persists completed work sessions, and renders state.
//!
//! ## Architecture
//!
//! - **Timer**: a pausable stopwatch with a fixed target duration. It holds
//!   no thread of its own -- the caller invokes `tick()` periodically and the
//!   timer recomputes elapsed time from a wall-clock anchor, so missed or
//!   delayed ticks never accumulate drift.
//! - **SessionManager**: owns the Timer, decides the next session type
//!   (work -> short break -> long break rotation) and auto-starts it when the
//!   timer completes.
//! - **Storage**: SQLite session history and TOML-based configuration.
//! - **Events**: every state change produces an [`Event`]; listeners can
//!   subscribe through the [`EventBus`] and are notified synchronously, in
//!   emission order.
//!
//! ## Key Components
//!
//! - [`Timer`]: elapsed/remaining time with pause/resume
//! - [`SessionManager`]: rotation state machine
//! - [`Database`]: work-session persistence and statistics
//! - [`Config`]: application configuration management
//! - [`NotificationSink`]: injected completion-alarm capability

pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, NotifyError};
pub use events::{Event, EventBus};
pub use notify::{AlarmPlayer, NotificationSink, NullNotifier};
pub use storage::{Config, Database, DayStats, WorkSessionRecord};
pub use timer::{SessionManager, SessionType, Settings, Timer, TimerState};
