mod engine;
mod session;

pub use engine::{format_hms, Timer, TimerState};
pub use session::{SessionManager, SessionType, Settings};
