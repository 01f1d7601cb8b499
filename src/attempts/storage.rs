//! Append-only attempt log backed by SQLite.
//!
//! One table, `card_attempts`, with secondary indexes on `card_id` and
//! `timestamp`. Rows are only ever inserted; nothing in the running service
//! updates or deletes them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, types::Type, Connection, Row};
use thiserror::Error;

use super::models::{AttemptRecord, CardAttemptSummary};

#[derive(Error, Debug)]
pub enum AttemptStorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Attempt database lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, AttemptStorageError>;

/// Covers the widest UTC offset plus a day, so a local wall-clock string
/// always lands on a strictly earlier or later date than the padded bound.
const LEGACY_OFFSET_MARGIN_HOURS: i64 = 48;

/// Storage manager for the attempt log
pub struct AttemptStorage {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl AttemptStorage {
    /// Open (creating if needed) the database file and ensure the schema exists.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let storage = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        storage.initialize()?;
        Ok(storage)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Create the table and indexes if missing. Safe to call repeatedly.
    pub fn initialize(&self) -> Result<()> {
        self.lock()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS card_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id TEXT NOT NULL,
                timestamp DATETIME NOT NULL,
                correct BOOLEAN NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_card_id ON card_attempts(card_id);
            CREATE INDEX IF NOT EXISTS idx_card_attempts_timestamp ON card_attempts(timestamp);
            "#,
        )?;
        Ok(())
    }

    /// Append one attempt stamped with the current time.
    pub fn record_attempt(&self, card_id: &str, correct: bool) -> Result<AttemptRecord> {
        let timestamp = Utc::now();
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO card_attempts (card_id, timestamp, correct) VALUES (?1, ?2, ?3)",
            params![card_id, format_timestamp(&timestamp), correct],
        )?;

        Ok(AttemptRecord {
            id: conn.last_insert_rowid(),
            card_id: card_id.to_string(),
            timestamp,
            correct,
        })
    }

    /// Most recent attempts first, optionally for a single card.
    pub fn list_attempts(&self, card_id: Option<&str>, limit: usize) -> Result<Vec<AttemptRecord>> {
        let conn = self.lock()?;
        let limit = limit as i64;

        let records = match card_id {
            Some(card_id) => {
                let mut stmt = conn.prepare(
                    "SELECT id, card_id, timestamp, correct FROM card_attempts
                     WHERE card_id = ?1 ORDER BY id DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![card_id, limit], row_to_record)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, card_id, timestamp, correct FROM card_attempts
                     ORDER BY id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], row_to_record)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        Ok(records)
    }

    /// Attempts with `from <= timestamp <= to`, oldest first.
    pub fn attempts_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<AttemptRecord>> {
        // Legacy rows hold local wall-clock text, so the indexed text range is
        // widened past any UTC offset and the exact bounds are applied after parsing.
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, card_id, timestamp, correct FROM card_attempts
             WHERE timestamp >= ?1 AND timestamp <= ?2",
        )?;
        let margin = chrono::Duration::hours(LEGACY_OFFSET_MARGIN_HOURS);
        let rows = stmt.query_map(
            params![
                format_timestamp(&from.checked_sub_signed(margin).unwrap_or(from)),
                format_timestamp(&to.checked_add_signed(margin).unwrap_or(to))
            ],
            row_to_record,
        )?;

        let mut records = Vec::new();
        for row in rows {
            let record = row?;
            if record.timestamp >= from && record.timestamp <= to {
                records.push(record);
            }
        }
        records.sort_by_key(|record| (record.timestamp, record.id));
        Ok(records)
    }

    /// Totals per card id, ordered by card id.
    pub fn summary_by_card(&self) -> Result<Vec<CardAttemptSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, card_id, timestamp, correct FROM card_attempts")?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut summaries: BTreeMap<String, CardAttemptSummary> = BTreeMap::new();
        for row in rows {
            let record = row?;
            let summary = summaries
                .entry(record.card_id.clone())
                .or_insert_with(|| CardAttemptSummary {
                    card_id: record.card_id.clone(),
                    total: 0,
                    correct: 0,
                    last_attempt: record.timestamp,
                });
            summary.total += 1;
            if record.correct {
                summary.correct += 1;
            }
            summary.last_attempt = summary.last_attempt.max(record.timestamp);
        }

        Ok(summaries.into_values().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| AttemptStorageError::LockPoisoned)
    }
}

/// RFC 3339 in UTC with a fixed nanosecond width, so text order is time order.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a stored timestamp. Offset-less values are read as local time.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    parse_timestamp(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid attempt timestamp: {}", value).into(),
        )
    })
}

fn row_to_record(row: &Row) -> rusqlite::Result<AttemptRecord> {
    Ok(AttemptRecord {
        id: row.get(0)?,
        card_id: row.get(1)?,
        timestamp: timestamp_column(row, 2)?,
        correct: row.get(3)?,
    })
}
