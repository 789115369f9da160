use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use pomotick_core::error::Result;
use pomotick_core::timer::format_hms;
use pomotick_core::{CoreError, Database};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's completed work sessions
    Today,
    /// Per-day aggregates over a date range
    Range {
        /// Start date (YYYY-MM-DD), inclusive
        #[arg(long)]
        from: String,
        /// End date (YYYY-MM-DD), inclusive
        #[arg(long)]
        to: String,
    },
    /// List individual sessions for a date
    Sessions {
        /// Date (YYYY-MM-DD); defaults to today
        date: Option<String>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    s.parse::<NaiveDate>()
        .map_err(|_| CoreError::Custom(format!("invalid date '{s}', expected YYYY-MM-DD")))
}

fn print_range(db: &Database, from: NaiveDate, to: NaiveDate) -> Result<()> {
    let stats = db.statistics(from, to)?;
    if stats.is_empty() {
        println!("no completed work sessions between {from} and {to}");
        return Ok(());
    }
    for day in &stats {
        println!(
            "{}  {:>3} session(s)  {}",
            day.date,
            day.session_count,
            format_hms(day.total_duration_secs)
        );
    }
    let total: u64 = stats.iter().map(|d| d.total_duration_secs).sum();
    let count: u64 = stats.iter().map(|d| d.session_count).sum();
    println!("total: {count} session(s), {}", format_hms(total));
    Ok(())
}

pub fn run(action: StatsAction) -> Result<()> {
    let db = Database::open()?;

    match action {
        StatsAction::Today => {
            let today = Utc::now().date_naive();
            print_range(&db, today, today)?;
        }
        StatsAction::Range { from, to } => {
            print_range(&db, parse_date(&from)?, parse_date(&to)?)?;
        }
        StatsAction::Sessions { date } => {
            let date = match date {
                Some(s) => parse_date(&s)?,
                None => Utc::now().date_naive(),
            };
            let sessions = db.sessions_by_date(date)?;
            if sessions.is_empty() {
                println!("no sessions on {date}");
                return Ok(());
            }
            for s in sessions {
                println!(
                    "{}  {}  {}  {}",
                    s.started_at.format("%H:%M:%S"),
                    s.session_type,
                    format_hms(s.duration_secs),
                    if s.is_completed { "completed" } else { "partial" }
                );
            }
        }
    }
    Ok(())
}
