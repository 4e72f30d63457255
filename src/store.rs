use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::eventlog::{decode, DecodedLog};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Receives the finished log of one session.
pub trait LogSink {
    fn ingest(&mut self, lines: &[String]) -> Result<DecodedLog>;
}

/// One persisted session.
#[derive(Debug, Clone)]
pub struct StoredLog {
    pub id: i64,
    pub game_id: Option<String>,
    pub raw_log: String,
    pub decoded: DecodedLog,
    pub created_at: DateTime<Local>,
}

/// SQLite store for raw logs and their decoded JSON. Resubmitting a session
/// stores it again; there is no dedupe.
#[derive(Debug)]
pub struct LogStore {
    conn: Connection,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS game_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        game_id TEXT,
        raw_log TEXT NOT NULL,
        decoded_json TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_game_logs_game_id ON game_logs(game_id);
"#;

impl LogStore {
    /// Opens the default database under the user's state directory.
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("molelog.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening log store");
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(LogStore { conn })
    }

    /// Stores raw text and decoded document; returns the row id.
    pub fn insert(&self, raw_log: &str, decoded: &DecodedLog) -> Result<i64> {
        let json = serde_json::to_string(decoded)?;
        self.conn.execute(
            r#"
            INSERT INTO game_logs (game_id, raw_log, decoded_json, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![decoded.game_id, raw_log, json, Local::now().to_rfc3339()],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, game_id = ?decoded.game_id, events = decoded.events.len(), "stored game log");
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<StoredLog>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, game_id, raw_log, decoded_json, created_at FROM game_logs WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, game_id, raw_log, json, created_at)) = row else {
            return Ok(None);
        };
        let decoded: DecodedLog = serde_json::from_str(&json)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Local))
            .unwrap_or_else(|_| Local::now());
        Ok(Some(StoredLog {
            id,
            game_id,
            raw_log,
            decoded,
            created_at,
        }))
    }

    /// Row ids stored for a game id, oldest first.
    pub fn ids_for_game(&self, game_id: &str) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM game_logs WHERE game_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map([game_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// `(id, game_id, final_score)` of every stored session, newest first.
    pub fn list(&self) -> Result<Vec<(i64, Option<String>, Option<u32>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, game_id, decoded_json FROM game_logs ORDER BY id DESC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, game_id, json)| -> Result<_> {
                let decoded: DecodedLog = serde_json::from_str(&json)?;
                Ok((id, game_id, decoded.final_score()))
            })
            .collect()
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM game_logs", [], |row| row.get(0))?)
    }
}

impl LogSink for LogStore {
    fn ingest(&mut self, lines: &[String]) -> Result<DecodedLog> {
        let raw = lines.join("\n");
        let decoded = decode(&raw);
        self.insert(&raw, &decoded)?;
        Ok(decoded)
    }
}
