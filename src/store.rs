//! SQLite counter store behind the engagement API.
//!
//! One row per `(id, area)`, created on the first event and only ever
//! incremented afterwards:
//!
//! ```sql
//! INSERT INTO counters (id, area, shares, downloads, copies) VALUES (?1, ?2, ?3, ?4, ?5)
//! ON CONFLICT(id, area) DO UPDATE SET downloads = downloads + 1
//! ```

use crate::report::EngagementEvent;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("database connection poisoned")]
    Poisoned,
}

/// Create the counters table if it does not exist yet.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS counters (
            id TEXT NOT NULL,
            area TEXT NOT NULL,
            shares INTEGER NOT NULL DEFAULT 0 CHECK (shares >= 0),
            downloads INTEGER NOT NULL DEFAULT 0 CHECK (downloads >= 0),
            copies INTEGER NOT NULL DEFAULT 0 CHECK (copies >= 0),
            PRIMARY KEY (id, area)
        );
        "#,
    )
}

/// Full counter row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRow {
    pub id: String,
    pub area: String,
    pub shares: i64,
    pub downloads: i64,
    pub copies: i64,
}

/// Row returned by `GET /api/top`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopEntry {
    pub id: String,
    pub area: String,
    pub shares: i64,
    pub downloads: i64,
    /// `shares + downloads`
    pub total: i64,
}

fn upsert_sql(event: EngagementEvent) -> &'static str {
    match event {
        EngagementEvent::Share => {
            "INSERT INTO counters (id, area, shares, downloads, copies) VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(id, area) DO UPDATE SET shares = shares + 1"
        }
        EngagementEvent::Download => {
            "INSERT INTO counters (id, area, shares, downloads, copies) VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(id, area) DO UPDATE SET downloads = downloads + 1"
        }
        EngagementEvent::Copy => {
            "INSERT INTO counters (id, area, shares, downloads, copies) VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(id, area) DO UPDATE SET copies = copies + 1"
        }
    }
}

pub struct CounterStore {
    conn: Mutex<Connection>,
}

impl CounterStore {
    /// Open or create the database file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        tracing::info!(path = %path.display(), "counter store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Count one event, creating the row if needed.
    pub fn increment(&self, id: &str, area: &str, event: EngagementEvent) -> Result<(), StoreError> {
        let initial = |e: EngagementEvent| i64::from(e == event);
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            upsert_sql(event),
            params![
                id,
                area,
                initial(EngagementEvent::Share),
                initial(EngagementEvent::Download),
                initial(EngagementEvent::Copy),
            ],
        )?;
        Ok(())
    }

    /// Rows with the highest `shares + downloads`, ties broken by id then area.
    pub fn top(&self, limit: u32) -> Result<Vec<TopEntry>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, area, shares, downloads, (shares + downloads) AS total \
             FROM counters ORDER BY total DESC, id ASC, area ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(TopEntry {
                id: row.get(0)?,
                area: row.get(1)?,
                shares: row.get(2)?,
                downloads: row.get(3)?,
                total: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get(&self, id: &str, area: &str) -> Result<Option<CounterRow>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, area, shares, downloads, copies FROM counters WHERE id = ?1 AND area = ?2",
        )?;
        let mut rows = stmt.query_map(params![id, area], |row| {
            Ok(CounterRow {
                id: row.get(0)?,
                area: row.get(1)?,
                shares: row.get(2)?,
                downloads: row.get(3)?,
                copies: row.get(4)?,
            })
        })?;
        Ok(rows.next().transpose()?)
    }

    pub fn row_count(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(conn.query_row("SELECT COUNT(*) FROM counters", [], |row| row.get(0))?)
    }
}
