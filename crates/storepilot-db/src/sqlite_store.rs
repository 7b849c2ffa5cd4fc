use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use storepilot_common::{Error, Result, ThreadId, UserId};
use tracing::{info, warn};

use crate::store::{EventEntry, LogStore, ThreadStore, TraceEntry, parse_timestamp};

/// SQLite-backed thread references and logs.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening store at {}", db_path.display());
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("connection lock poisoned".to_string()))
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS user_threads (
                    user_id TEXT PRIMARY KEY,
                    thread_id TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS event_log (
                    id TEXT PRIMARY KEY,
                    time TEXT NOT NULL,
                    user_id TEXT,
                    event TEXT,
                    prompt TEXT,
                    reply TEXT
                );

                CREATE TABLE IF NOT EXISTS debug_log (
                    id TEXT PRIMARY KEY,
                    time TEXT NOT NULL,
                    direction TEXT NOT NULL,
                    content TEXT NOT NULL
                );",
            )
            .map_err(|e| Error::Database(format!("migration failed: {e}")))?;
        Ok(())
    }
}

impl ThreadStore for SqliteStore {
    fn get(&self, user: &UserId) -> Result<Option<ThreadId>> {
        self.conn()?
            .query_row(
                "SELECT thread_id FROM user_threads WHERE user_id = ?1",
                params![user.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map(|id| id.filter(|s| !s.is_empty()).map(ThreadId::from))
            .map_err(|e| Error::Database(format!("failed to load thread: {e}")))
    }

    fn set(&self, user: &UserId, thread: &ThreadId) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO user_threads (user_id, thread_id)
                 VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET
                   thread_id = excluded.thread_id,
                   updated_at = datetime('now')",
                params![user.as_str(), thread.as_str()],
            )
            .map_err(|e| Error::Database(format!("failed to save thread: {e}")))?;
        Ok(())
    }

    fn clear(&self, user: &UserId) -> Result<()> {
        self.conn()?
            .execute(
                "DELETE FROM user_threads WHERE user_id = ?1",
                params![user.as_str()],
            )
            .map_err(|e| Error::Database(format!("failed to clear thread: {e}")))?;
        Ok(())
    }
}

impl LogStore for SqliteStore {
    fn append_event(&self, entry: &EventEntry) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO event_log (id, time, user_id, event, prompt, reply)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    entry.time.to_rfc3339(),
                    entry.user_id.as_ref().map(UserId::as_str),
                    entry.event,
                    entry.prompt,
                    entry.reply
                ],
            )
            .map_err(|e| Error::Database(format!("failed to append event: {e}")))?;
        Ok(())
    }

    fn append_trace(&self, entry: &TraceEntry) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO debug_log (id, time, direction, content)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    entry.time.to_rfc3339(),
                    entry.direction.as_str(),
                    entry.content
                ],
            )
            .map_err(|e| Error::Database(format!("failed to append trace: {e}")))?;
        Ok(())
    }

    fn recent_events(&self, limit: usize) -> Result<Vec<EventEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT time, user_id, event, prompt, reply
                 FROM event_log
                 ORDER BY rowid DESC
                 LIMIT ?1",
            )
            .map_err(|e| Error::Database(format!("failed to prepare event query: {e}")))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let time_raw: String = row.get(0)?;
                Ok(EventEntry {
                    time: parse_timestamp(&time_raw),
                    user_id: row.get::<_, Option<String>>(1)?.map(UserId::from),
                    event: row.get(2)?,
                    prompt: row.get(3)?,
                    reply: row.get(4)?,
                })
            })
            .map_err(|e| Error::Database(format!("failed to load events: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            match row {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("skipping unreadable event row: {e}"),
            }
        }
        Ok(entries)
    }

    fn recent_traces(&self, limit: usize) -> Result<Vec<TraceEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT time, direction, content
                 FROM debug_log
                 ORDER BY rowid DESC
                 LIMIT ?1",
            )
            .map_err(|e| Error::Database(format!("failed to prepare trace query: {e}")))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let time_raw: String = row.get(0)?;
                let direction_raw: String = row.get(1)?;
                let content: String = row.get(2)?;
                Ok((time_raw, direction_raw, content))
            })
            .map_err(|e| Error::Database(format!("failed to load traces: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            let (time_raw, direction_raw, content) = match row {
                Ok(r) => r,
                Err(e) => {
                    warn!("skipping unreadable trace row: {e}");
                    continue;
                }
            };
            match direction_raw.parse() {
                Ok(direction) => entries.push(TraceEntry {
                    time: parse_timestamp(&time_raw),
                    direction,
                    content,
                }),
                Err(e) => warn!("skipping trace row: {e}"),
            }
        }
        Ok(entries)
    }

    fn clear_events(&self) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM event_log", [])
            .map_err(|e| Error::Database(format!("failed to clear events: {e}")))?;
        Ok(())
    }

    fn clear_traces(&self) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM debug_log", [])
            .map_err(|e| Error::Database(format!("failed to clear traces: {e}")))?;
        Ok(())
    }
}
