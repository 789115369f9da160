//! SQLite-based work-session storage and statistics.
//!
//! The core never calls this module itself -- it only emits events. The
//! presentation layer records a row per completed (or abandoned) work
//! session and queries history for reporting.
//!
//! Also provides a small key-value table the CLI uses to persist the
//! serialized session manager between invocations.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::DatabaseError;
use crate::timer::SessionType;

/// One persisted work session. Never mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSessionRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
    /// False for partial records written when a running session was
    /// abandoned (reset or abrupt shutdown).
    pub is_completed: bool,
    pub session_type: String,
}

/// Per-day aggregate over completed work sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayStats {
    pub date: NaiveDate,
    pub total_duration_secs: u64,
    pub session_count: u64,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pomotick/pomotick.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()
            .map_err(|e| DatabaseError::DataDir(e.to_string()))?
            .join("pomotick.db");
        let conn = Connection::open(&path)
            .map_err(|source| DatabaseError::OpenFailed { path, source })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS work_sessions (
                    id            INTEGER PRIMARY KEY AUTOINCREMENT,
                    started_at    TEXT NOT NULL,
                    ended_at      TEXT NOT NULL,
                    duration_secs INTEGER NOT NULL,
                    is_completed  INTEGER NOT NULL DEFAULT 0,
                    session_type  TEXT NOT NULL DEFAULT 'work'
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_work_sessions_started_at
                    ON work_sessions(started_at);
                CREATE INDEX IF NOT EXISTS idx_work_sessions_type_completed
                    ON work_sessions(session_type, is_completed);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Insert a session record, returning its row id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn save_session(
        &self,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        duration_secs: u64,
        is_completed: bool,
        session_type: SessionType,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO work_sessions (started_at, ended_at, duration_secs, is_completed, session_type)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                to_db_time(started_at),
                to_db_time(ended_at),
                duration_secs,
                is_completed,
                session_type.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All sessions that started on the given calendar day, ordered by
    /// start time.
    pub fn sessions_by_date(&self, date: NaiveDate) -> Result<Vec<WorkSessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, ended_at, duration_secs, is_completed, session_type
             FROM work_sessions
             WHERE date(started_at) = ?1
             ORDER BY started_at",
        )?;

        let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], |row| {
            Ok(WorkSessionRecord {
                id: row.get(0)?,
                started_at: parse_db_time(row.get::<_, String>(1)?, 1)?,
                ended_at: parse_db_time(row.get::<_, String>(2)?, 2)?,
                duration_secs: row.get(3)?,
                is_completed: row.get(4)?,
                session_type: row.get(5)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Per-day aggregates over the inclusive date range, restricted to
    /// completed work sessions, ordered by date.
    pub fn statistics(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DayStats>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT date(started_at) AS work_date,
                    COALESCE(SUM(duration_secs), 0),
                    COUNT(*)
             FROM work_sessions
             WHERE date(started_at) BETWEEN ?1 AND ?2
               AND session_type = 'work'
               AND is_completed = 1
             GROUP BY date(started_at)
             ORDER BY work_date",
        )?;

        let rows = stmt.query_map(
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string()
            ],
            |row| {
                let date_str = row.get::<_, String>(0)?;
                let date = date_str.parse::<NaiveDate>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(DayStats {
                    date,
                    total_duration_secs: row.get(1)?,
                    session_count: row.get(2)?,
                })
            },
        )?;

        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Whole-second RFC 3339, which SQLite's date() understands.
fn to_db_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_db_time(s: String, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(date: &str, hour: u32) -> DateTime<Utc> {
        let d = date.parse::<NaiveDate>().unwrap();
        Utc.from_utc_datetime(&d.and_hms_opt(hour, 0, 0).unwrap())
    }

    #[test]
    fn sessions_by_date_filters_and_orders() {
        let db = Database::open_memory().unwrap();
        db.save_session(at("2026-08-29", 14), at("2026-08-29", 15), 1500, true, SessionType::Work)
            .unwrap();
        db.save_session(at("2026-08-29", 9), at("2026-08-29", 10), 1500, true, SessionType::Work)
            .unwrap();
        db.save_session(at("2026-08-30", 9), at("2026-08-30", 10), 1500, true, SessionType::Work)
            .unwrap();

        let day = db
            .sessions_by_date("2026-08-29".parse().unwrap())
            .unwrap();
        assert_eq!(day.len(), 2);
        assert!(day[0].started_at < day[1].started_at);
        assert_eq!(day[0].session_type, "work");
        assert_eq!(day[0].duration_secs, 1500);
    }

    #[test]
    fn statistics_counts_only_completed_work() {
        let db = Database::open_memory().unwrap();
        let start = "2026-08-01".parse::<NaiveDate>().unwrap();
        let end = "2026-08-31".parse::<NaiveDate>().unwrap();

        db.save_session(at("2026-08-10", 9), at("2026-08-10", 10), 1500, true, SessionType::Work)
            .unwrap();
        db.save_session(at("2026-08-10", 11), at("2026-08-10", 12), 1500, true, SessionType::Work)
            .unwrap();
        // Partial work session and a completed break: both excluded.
        db.save_session(at("2026-08-10", 13), at("2026-08-10", 14), 600, false, SessionType::Work)
            .unwrap();
        db.save_session(
            at("2026-08-10", 14),
            at("2026-08-10", 15),
            300,
            true,
            SessionType::ShortBreak,
        )
        .unwrap();
        db.save_session(at("2026-08-12", 9), at("2026-08-12", 10), 1500, true, SessionType::Work)
            .unwrap();

        let stats = db.statistics(start, end).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].date, "2026-08-10".parse().unwrap());
        assert_eq!(stats[0].session_count, 2);
        assert_eq!(stats[0].total_duration_secs, 3000);
        assert_eq!(stats[1].date, "2026-08-12".parse().unwrap());
        assert_eq!(stats[1].session_count, 1);
    }

    #[test]
    fn statistics_respects_date_range() {
        let db = Database::open_memory().unwrap();
        db.save_session(at("2026-07-31", 9), at("2026-07-31", 10), 1500, true, SessionType::Work)
            .unwrap();
        db.save_session(at("2026-08-01", 9), at("2026-08-01", 10), 1500, true, SessionType::Work)
            .unwrap();

        let stats = db
            .statistics("2026-08-01".parse().unwrap(), "2026-08-31".parse().unwrap())
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].date, "2026-08-01".parse().unwrap());
    }

    #[test]
    fn timestamps_round_trip() {
        let db = Database::open_memory().unwrap();
        let started = at("2026-08-29", 9);
        let ended = at("2026-08-29", 10);
        db.save_session(started, ended, 1500, true, SessionType::Work)
            .unwrap();

        let day = db.sessions_by_date("2026-08-29".parse().unwrap()).unwrap();
        assert_eq!(day[0].started_at, started);
        assert_eq!(day[0].ended_at, ended);
        assert!(day[0].is_completed);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_set("test", "again").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "again");
    }
}
