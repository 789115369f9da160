//! Timer control commands.
//!
//! The session manager is serialized into the kv table between invocations,
//! so `start` / `status` / `pause` work across separate process runs: the
//! wall-clock anchor inside the timer keeps elapsed time accurate no matter
//! how much later the next invocation happens. `watch` is the foreground
//! mode that ticks once per second and records completed work sessions.

use std::path::PathBuf;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use clap::Subcommand;
use pomotick_core::error::Result;
use pomotick_core::{
    AlarmPlayer, Config, Database, Event, SessionManager, SessionType, TimerState,
};

const MANAGER_KEY: &str = "session_manager";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start (or restart) the current session
    Start,
    /// Pause the running timer
    Pause,
    /// Resume a paused timer
    Resume,
    /// Abandon the cycle and return to the initial work state
    Reset,
    /// Print current state as JSON (advances the timer first)
    Status,
    /// Run in the foreground, ticking once per second
    Watch,
}

fn load_manager(db: &Database, config: &Config) -> Result<SessionManager> {
    let settings = config.settings()?;
    let mut manager = match db.kv_get(MANAGER_KEY)? {
        Some(json) => serde_json::from_str(&json)?,
        None => SessionManager::new(settings),
    };
    // Settings changes apply from the next session start.
    manager.reload_settings(settings);
    manager.set_notifier(Box::new(AlarmPlayer::new(
        config.notifications.custom_sound.clone().map(PathBuf::from),
    )));
    Ok(manager)
}

fn save_manager(db: &Database, manager: &SessionManager) -> Result<()> {
    let json = serde_json::to_string(manager)?;
    db.kv_set(MANAGER_KEY, &json)?;
    Ok(())
}

/// Advance the timer and persist any work session that just completed.
///
/// The record is keyed by wall-clock timestamps: the session ended at the
/// completion event and started one target-duration earlier.
fn tick_and_record(manager: &mut SessionManager, db: &Database) -> Result<Vec<Event>> {
    let target_secs = manager.timer().target_secs();
    let events = manager.tick();
    for event in &events {
        if let Event::SessionCompleted {
            session_type: SessionType::Work,
            at,
        } = event
        {
            let started_at = *at - Duration::seconds(target_secs as i64);
            db.save_session(started_at, *at, target_secs, true, SessionType::Work)?;
        }
    }
    Ok(events)
}

/// Write a partial record for a work session about to be abandoned.
fn record_partial(manager: &SessionManager, db: &Database) -> Result<()> {
    let elapsed_secs = manager.timer().elapsed_secs();
    if manager.timer().state() == TimerState::Stopped
        || manager.current_session_type() != SessionType::Work
        || elapsed_secs == 0
    {
        return Ok(());
    }
    let ended_at = Utc::now();
    let started_at = ended_at - Duration::seconds(elapsed_secs as i64);
    db.save_session(started_at, ended_at, elapsed_secs, false, SessionType::Work)?;
    Ok(())
}

fn print_events(events: &[Event]) -> Result<()> {
    for event in events {
        println!("{}", serde_json::to_string_pretty(event)?);
    }
    Ok(())
}

pub fn run(action: TimerAction) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open()?;
    let mut manager = load_manager(&db, &config)?;

    match action {
        TimerAction::Start => {
            let events = manager.start_next_session();
            print_events(&events)?;
        }
        TimerAction::Pause => {
            // Refresh elapsed time before freezing it.
            tick_and_record(&mut manager, &db)?;
            let events = manager.pause();
            print_events(&events)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&manager.snapshot())?
            );
        }
        TimerAction::Resume => {
            let events = manager.resume();
            print_events(&events)?;
        }
        TimerAction::Reset => {
            let events = tick_and_record(&mut manager, &db)?;
            print_events(&events)?;
            record_partial(&manager, &db)?;
            manager.reset();
            println!("{{\"type\": \"timer_reset\"}}");
        }
        TimerAction::Status => {
            let events = tick_and_record(&mut manager, &db)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&manager.snapshot())?
            );
            for event in &events {
                if matches!(
                    event,
                    Event::SessionCompleted { .. } | Event::SessionChanged { .. }
                ) {
                    println!("{}", serde_json::to_string_pretty(event)?);
                }
            }
        }
        TimerAction::Watch => {
            watch(&mut manager, &db)?;
        }
    }

    save_manager(&db, &manager)?;
    Ok(())
}

fn watch(manager: &mut SessionManager, db: &Database) -> Result<()> {
    if manager.timer().state() == TimerState::Stopped {
        let events = manager.start_next_session();
        announce(&events);
    } else {
        println!(
            "{} {} remaining",
            manager.current_session_type(),
            manager.timer().remaining_hms()
        );
    }

    loop {
        thread::sleep(StdDuration::from_secs(1));
        let events = tick_and_record(manager, db)?;
        announce(&events);
        if events
            .iter()
            .any(|e| matches!(e, Event::TimerTick { .. }))
        {
            println!(
                "{} {} remaining",
                manager.current_session_type(),
                manager.timer().remaining_hms()
            );
        }
        save_manager(db, manager)?;
    }
}

fn announce(events: &[Event]) {
    for event in events {
        match event {
            Event::SessionCompleted { session_type, .. } => {
                println!("completed: {session_type}");
            }
            Event::SessionChanged {
                session_type,
                duration_min,
                ..
            } => {
                println!("next: {session_type} ({duration_min} min)");
            }
            _ => {}
        }
    }
}
