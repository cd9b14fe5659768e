//! SQLite database storage
//!
//! Holds the append-only event log, the daily snapshot table and the
//! single-row heartbeat. The connection is opened on first use and kept;
//! a statement that fails drops it so the next call reconnects.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};
use stats::{AggregatedStats, StatsSummary};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct Database {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

/// One row of the event log
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: i64,
    pub event_type: String,
    pub timestamp: String,
    pub details: Option<String>,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            conn: Mutex::new(None),
        }
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .with_context(|| format!("Failed to open database {:?}", self.path))?;

        // Enable WAL mode for better concurrent read/write performance
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;

        // Set busy timeout to 5 seconds (handles brief lock conflicts)
        conn.pragma_update(None, "busy_timeout", "5000")
            .context("Failed to set busy timeout")?;

        info!("Database connection established ({:?})", self.path);
        Ok(conn)
    }

    /// Run `f` on the shared connection, opening it if needed
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let mut slot = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        let conn = match slot.take() {
            Some(conn) => conn,
            None => self.open()?,
        };

        match f(&conn) {
            Ok(value) => {
                *slot = Some(conn);
                Ok(value)
            }
            Err(e) => {
                debug!("Closing database connection after error: {}", e);
                Err(e.into())
            }
        }
    }

    pub fn initialize(&self) -> Result<()> {
        info!("Initializing database schema");

        self.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS event_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    event_type TEXT NOT NULL,
                    timestamp DATETIME DEFAULT (datetime('now','localtime')),
                    details TEXT
                );

                CREATE TABLE IF NOT EXISTS daily_stats (
                    date DATE,
                    time TIME,
                    uptime_seconds REAL,
                    downtime_seconds REAL,
                    high_ping_count INTEGER,
                    high_ping_seconds REAL,
                    internet_failures INTEGER,
                    total_pings INTEGER,
                    failed_pings INTEGER,
                    average_ping REAL,
                    max_ping REAL,
                    longest_downtime REAL,
                    system_downtime_seconds REAL,
                    PRIMARY KEY (date, time)
                );

                CREATE TABLE IF NOT EXISTS heartbeat (
                    id INTEGER PRIMARY KEY CHECK (id=1),
                    last_heartbeat DATETIME DEFAULT (datetime('now','localtime'))
                );

                INSERT OR IGNORE INTO heartbeat (id, last_heartbeat)
                VALUES (1, datetime('now','localtime'));",
            )
        })
        .context("Failed to initialize database schema")?;

        // Older databases predate the system downtime column
        let has_system_downtime = self.with_conn(|conn| {
            let mut stmt = conn.prepare("PRAGMA table_info(daily_stats)")?;
            let columns = stmt
                .query_map([], |row| row.get::<_, String>(1))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(columns.iter().any(|c| c == "system_downtime_seconds"))
        })?;

        if !has_system_downtime {
            self.with_conn(|conn| {
                conn.execute(
                    "ALTER TABLE daily_stats ADD COLUMN system_downtime_seconds REAL",
                    [],
                )
            })
            .context("Failed to add system_downtime_seconds column")?;
            info!("Added system_downtime_seconds column to daily_stats");
        }

        info!("Database schema initialized");

        Ok(())
    }

    /// Append one event; the timestamp defaults to local time
    pub fn log_event(&self, event_type: &str, details: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO event_log (event_type, details) VALUES (?1, ?2)",
                params![event_type, details],
            )
        })?;

        info!("Event: {} | Details: {}", event_type, details);
        Ok(())
    }

    /// Most recent events, newest first
    #[cfg(test)]
    pub fn recent_events(&self, limit: usize) -> Result<Vec<EventRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, event_type, timestamp, details
                FROM event_log
                ORDER BY id DESC
                LIMIT ?1",
            )?;

            let events = stmt
                .query_map(params![limit as i64], |row| {
                    Ok(EventRecord {
                        id: row.get(0)?,
                        event_type: row.get(1)?,
                        timestamp: row.get(2)?,
                        details: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(events)
        })
    }

    /// Persist a snapshot taken at `at` (local wall-clock time)
    pub fn insert_daily_snapshot(&self, at: NaiveDateTime, s: &StatsSummary) -> Result<()> {
        let date = at.format("%Y-%m-%d").to_string();
        let time = at.format("%H:%M:%S").to_string();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO daily_stats (
                    date, time, uptime_seconds, downtime_seconds, high_ping_count,
                    high_ping_seconds, internet_failures, total_pings, failed_pings,
                    average_ping, max_ping, longest_downtime, system_downtime_seconds
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    date,
                    time,
                    s.uptime_secs,
                    s.downtime_secs,
                    s.high_ping_count as i64,
                    s.high_ping_secs,
                    s.internet_failures as i64,
                    s.total_pings as i64,
                    s.failed_pings as i64,
                    s.average_ping_ms,
                    s.max_ping_ms,
                    s.longest_downtime_secs,
                    s.system_downtime_secs,
                ],
            )
        })
        .with_context(|| format!("Failed to store daily snapshot {} {}", date, time))?;

        Ok(())
    }

    /// Aggregate every snapshot dated on or after `start`.
    ///
    /// Returns `None` when the window holds no rows.
    pub fn aggregate_since(&self, start: NaiveDate) -> Result<Option<AggregatedStats>> {
        let start = start.format("%Y-%m-%d").to_string();

        let row = self.with_conn(|conn| {
            conn.query_row(
                "SELECT
                    COUNT(*),
                    SUM(uptime_seconds),
                    SUM(downtime_seconds),
                    SUM(high_ping_count),
                    SUM(high_ping_seconds),
                    SUM(internet_failures),
                    SUM(total_pings),
                    SUM(failed_pings),
                    AVG(average_ping),
                    MAX(max_ping),
                    MAX(longest_downtime),
                    SUM(system_downtime_seconds)
                FROM daily_stats
                WHERE date >= ?1",
                params![start],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        AggregatedStats {
                            snapshots: row.get::<_, i64>(0)? as u64,
                            uptime_secs: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                            downtime_secs: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                            high_ping_count: row.get::<_, Option<i64>>(3)?.unwrap_or(0) as u64,
                            high_ping_secs: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
                            internet_failures: row.get::<_, Option<i64>>(5)?.unwrap_or(0) as u64,
                            total_pings: row.get::<_, Option<i64>>(6)?.unwrap_or(0) as u64,
                            failed_pings: row.get::<_, Option<i64>>(7)?.unwrap_or(0) as u64,
                            average_ping_ms: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
                            max_ping_ms: row.get::<_, Option<f64>>(9)?.unwrap_or(0.0),
                            longest_downtime_secs: row.get::<_, Option<f64>>(10)?.unwrap_or(0.0),
                            system_downtime_secs: row.get::<_, Option<f64>>(11)?.unwrap_or(0.0),
                        },
                    ))
                },
            )
        })?;

        let (count, aggregated) = row;
        if count == 0 {
            return Ok(None);
        }

        Ok(Some(aggregated))
    }

    pub fn update_heartbeat(&self, at: NaiveDateTime) -> Result<()> {
        let at = at.format(DATETIME_FORMAT).to_string();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO heartbeat (id, last_heartbeat) VALUES (1, ?1)
                ON CONFLICT(id) DO UPDATE SET last_heartbeat = excluded.last_heartbeat",
                params![at],
            )
        })?;

        Ok(())
    }

    pub fn last_heartbeat(&self) -> Result<Option<NaiveDateTime>> {
        let value: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT last_heartbeat FROM heartbeat WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map(Option::flatten)
        })?;

        match value {
            Some(text) => match NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT) {
                Ok(at) => Ok(Some(at)),
                Err(e) => {
                    warn!("Ignoring unparsable heartbeat {:?}: {}", text, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db"));
        db.initialize().unwrap();
        (dir, db)
    }

    fn datetime(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), DATETIME_FORMAT).unwrap()
    }

    fn summary(uptime: f64, average_ping: f64, max_ping: f64) -> StatsSummary {
        StatsSummary {
            uptime_secs: uptime,
            downtime_secs: 60.0,
            high_ping_count: 2,
            high_ping_secs: 30.0,
            internet_failures: 1,
            total_pings: 100,
            failed_pings: 4,
            average_ping_ms: average_ping,
            max_ping_ms: max_ping,
            longest_downtime_secs: uptime / 100.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_dir, db) = test_db();
        db.initialize().unwrap();
        assert!(db.last_heartbeat().unwrap().is_some());
    }

    #[test]
    fn test_event_log_appends() {
        let (_dir, db) = test_db();
        db.log_event("Internet Down", "all hosts unreachable").unwrap();
        db.log_event("Internet Restored", "back").unwrap();

        let events = db.recent_events(10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "Internet Restored");
        assert!(events[0].id > events[1].id);
        assert_eq!(events[1].details.as_deref(), Some("all hosts unreachable"));
        assert!(!events[0].timestamp.is_empty());
    }

    #[test]
    fn test_weekly_aggregation_sums_and_averages() {
        let (_dir, db) = test_db();
        db.insert_daily_snapshot(datetime("2024-03-10", "07:00:00"), &summary(3600.0, 20.0, 90.0))
            .unwrap();
        db.insert_daily_snapshot(datetime("2024-03-11", "18:00:00"), &summary(7200.0, 40.0, 120.0))
            .unwrap();
        // outside the window
        db.insert_daily_snapshot(datetime("2024-02-01", "07:00:00"), &summary(99999.0, 500.0, 900.0))
            .unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let agg = db.aggregate_since(start).unwrap().unwrap();

        assert_eq!(agg.snapshots, 2);
        assert_eq!(agg.uptime_secs, 10800.0);
        assert_eq!(agg.downtime_secs, 120.0);
        assert_eq!(agg.high_ping_count, 4);
        assert_eq!(agg.internet_failures, 2);
        assert_eq!(agg.total_pings, 200);
        assert_eq!(agg.failed_pings, 8);
        assert_eq!(agg.average_ping_ms, 30.0);
        assert_eq!(agg.max_ping_ms, 120.0);
        assert_eq!(agg.longest_downtime_secs, 72.0);
    }

    #[test]
    fn test_aggregation_without_rows() {
        let (_dir, db) = test_db();
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(db.aggregate_since(start).unwrap().is_none());
    }

    #[test]
    fn test_same_second_snapshot_is_rejected_then_recovers() {
        let (_dir, db) = test_db();
        let at = datetime("2024-03-10", "07:00:00");
        db.insert_daily_snapshot(at, &summary(1.0, 1.0, 1.0)).unwrap();
        assert!(db.insert_daily_snapshot(at, &summary(1.0, 1.0, 1.0)).is_err());

        // connection is reopened transparently
        db.log_event("Daily Stats", "after error").unwrap();
        assert_eq!(db.recent_events(1).unwrap()[0].details.as_deref(), Some("after error"));
    }

    #[test]
    fn test_heartbeat_upsert() {
        let (_dir, db) = test_db();
        let at = datetime("2024-03-10", "12:34:56");
        db.update_heartbeat(at).unwrap();
        assert_eq!(db.last_heartbeat().unwrap(), Some(at));

        let later = datetime("2024-03-10", "12:35:56");
        db.update_heartbeat(later).unwrap();
        assert_eq!(db.last_heartbeat().unwrap(), Some(later));
    }

    #[test]
    fn test_legacy_daily_stats_table_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE daily_stats (
                    date DATE, time TIME, uptime_seconds REAL, downtime_seconds REAL,
                    high_ping_count INTEGER, high_ping_seconds REAL, internet_failures INTEGER,
                    total_pings INTEGER, failed_pings INTEGER, average_ping REAL, max_ping REAL,
                    longest_downtime REAL, PRIMARY KEY (date, time)
                );",
            )
            .unwrap();
        }

        let db = Database::new(&path);
        db.initialize().unwrap();

        let mut s = summary(60.0, 10.0, 20.0);
        s.system_downtime_secs = 300.0;
        db.insert_daily_snapshot(datetime("2024-03-10", "07:00:00"), &s).unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(db.aggregate_since(start).unwrap().unwrap().system_downtime_secs, 300.0);
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");
        {
            let db = Database::new(&path);
            db.initialize().unwrap();
            db.log_event("Weekly Stats", "Weekly Stats Recorded").unwrap();
        }

        let db = Database::new(&path);
        db.initialize().unwrap();
        assert_eq!(db.recent_events(5).unwrap().len(), 1);
    }
}
