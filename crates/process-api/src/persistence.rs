//! SQLite persistence of runs, events, and snapshots.

use std::fmt;
use std::path::Path;

use contracts::{Event, RunConfig, RunStatus, Snapshot};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    /// The engine could not produce the state being persisted.
    Engine(String),
    NotAttached,
    RunAlreadyExists(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
            Self::Engine(reason) => write!(f, "engine error: {reason}"),
            Self::NotAttached => write!(f, "sqlite store is not attached"),
            Self::RunAlreadyExists(run_id) => write!(f, "run {run_id} already exists"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRunSummary {
    pub run_id: String,
    pub current_tick: u64,
    pub max_ticks: u64,
    pub event_count: u64,
}

#[derive(Debug)]
pub struct SqliteRunStore {
    conn: Connection,
}

impl SqliteRunStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        let store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    fn configure(&self) -> Result<(), PersistenceError> {
        // journal_mode reports the resulting mode as a row.
        let _mode: String = self
            .conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
                 run_id       TEXT PRIMARY KEY,
                 config_json  TEXT NOT NULL,
                 status_json  TEXT NOT NULL,
                 updated_tick INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS events (
                 run_id           TEXT NOT NULL,
                 event_id         TEXT NOT NULL,
                 tick             INTEGER NOT NULL,
                 sequence_in_tick INTEGER NOT NULL,
                 event_type       TEXT NOT NULL,
                 payload_json     TEXT NOT NULL,
                 PRIMARY KEY (run_id, event_id)
             );
             CREATE INDEX IF NOT EXISTS idx_events_run_tick
                 ON events (run_id, tick, sequence_in_tick);
             CREATE TABLE IF NOT EXISTS snapshots (
                 run_id        TEXT NOT NULL,
                 tick          INTEGER NOT NULL,
                 snapshot_json TEXT NOT NULL,
                 PRIMARY KEY (run_id, tick)
             );",
        )?;
        Ok(())
    }

    pub fn run_exists(&self, run_id: &str) -> Result<bool, PersistenceError> {
        let found = self
            .conn
            .query_row(
                "SELECT run_id FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn delete_run(&mut self, run_id: &str) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM events WHERE run_id = ?1", params![run_id])?;
        tx.execute("DELETE FROM snapshots WHERE run_id = ?1", params![run_id])?;
        tx.execute("DELETE FROM runs WHERE run_id = ?1", params![run_id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn persist_delta(
        &mut self,
        config: &RunConfig,
        status: &RunStatus,
        events: &[Event],
        snapshot: Option<&Snapshot>,
    ) -> Result<(), PersistenceError> {
        let config_json = serde_json::to_string(config)?;
        let status_json = serde_json::to_string(status)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO runs (run_id, config_json, status_json, updated_tick)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (run_id) DO UPDATE SET
                 config_json = excluded.config_json,
                 status_json = excluded.status_json,
                 updated_tick = excluded.updated_tick",
            params![
                config.run_id.as_str(),
                config_json,
                status_json,
                i64::try_from(status.current_tick).unwrap_or(i64::MAX),
            ],
        )?;

        for event in events {
            let payload_json = serde_json::to_string(event)?;
            let type_label = serde_json::to_string(&event.event_type)?;
            tx.execute(
                "INSERT OR IGNORE INTO events (
                     run_id, event_id, tick, sequence_in_tick, event_type, payload_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.run_id.as_str(),
                    event.event_id.as_str(),
                    i64::try_from(event.tick).unwrap_or(i64::MAX),
                    i64::try_from(event.sequence_in_tick).unwrap_or(i64::MAX),
                    type_label.trim_matches('"'),
                    payload_json,
                ],
            )?;
        }

        if let Some(snapshot) = snapshot {
            let snapshot_json = serde_json::to_string(snapshot)?;
            tx.execute(
                "INSERT OR REPLACE INTO snapshots (run_id, tick, snapshot_json)
                 VALUES (?1, ?2, ?3)",
                params![
                    snapshot.run_id.as_str(),
                    i64::try_from(snapshot.tick).unwrap_or(i64::MAX),
                    snapshot_json,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn list_runs(&self) -> Result<Vec<PersistedRunSummary>, PersistenceError> {
        let mut statement = self.conn.prepare(
            "SELECT r.run_id, r.status_json,
                    (SELECT COUNT(*) FROM events e WHERE e.run_id = r.run_id)
             FROM runs r ORDER BY r.run_id",
        )?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (run_id, status_json, event_count) = row?;
            let status: RunStatus = serde_json::from_str(&status_json)?;
            summaries.push(PersistedRunSummary {
                run_id,
                current_tick: status.current_tick,
                max_ticks: status.max_ticks,
                event_count: event_count.max(0) as u64,
            });
        }
        Ok(summaries)
    }

    pub fn load_events(
        &self,
        run_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Event>, PersistenceError> {
        let mut statement = self.conn.prepare(
            "SELECT payload_json FROM events
             WHERE run_id = ?1
             ORDER BY tick, sequence_in_tick
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = statement.query_map(
            params![
                run_id,
                i64::try_from(limit).unwrap_or(i64::MAX),
                i64::try_from(offset).unwrap_or(i64::MAX),
            ],
            |row| row.get::<_, String>(0),
        )?;

        let mut events = Vec::new();
        for row in rows {
            events.push(serde_json::from_str(&row?)?);
        }
        Ok(events)
    }

    pub fn latest_snapshot(&self, run_id: &str) -> Result<Option<Snapshot>, PersistenceError> {
        let found = self
            .conn
            .query_row(
                "SELECT snapshot_json FROM snapshots
                 WHERE run_id = ?1 ORDER BY tick DESC LIMIT 1",
                params![run_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match found {
            Some(snapshot_json) => Ok(Some(serde_json::from_str(&snapshot_json)?)),
            None => Ok(None),
        }
    }
}
