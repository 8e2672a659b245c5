use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Columns the `messages` table must carry, added to older databases on open
const REQUIRED_COLUMNS: &[(&str, &str)] = &[
    ("id", "INTEGER PRIMARY KEY"),
    ("chat_id", "INTEGER"),
    ("message_text", "TEXT"),
    ("date", "TEXT"),
    ("urls", "TEXT"),
];

/// One exported message, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub message_id: i64,
    pub chat_id: i64,
    pub markup: String,
    pub date: String,
    pub urls: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    UrlsUpdated,
    Unchanged,
}

/// SQLite store of exported messages, keyed by message id
#[derive(Clone)]
pub struct MessageStore {
    conn: Arc<Mutex<Connection>>,
}

impl MessageStore {
    /// Open or create the SQLite database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // Migrations run on the raw connection before wrapping in Mutex
        Self::run_migrations(&conn)?;

        info!("Message store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY
            );
            ",
        )
        .context("Failed to create messages table")?;

        ensure_columns(conn)
    }

    /// Look up the stored URL string for a message.
    /// Outer `None` means no row; inner `None` means the row has NULL urls.
    #[cfg(test)]
    pub async fn stored_urls(&self, message_id: i64) -> Result<Option<Option<String>>> {
        let conn = self.conn.lock().await;
        stored_urls(&conn, message_id)
    }

    /// Insert a new row, or refresh only the `urls` column of an existing one
    /// when it changed. The stored markup of an existing row is never rewritten.
    #[cfg(test)]
    pub async fn upsert(&self, row: &ExportRow) -> Result<UpsertOutcome> {
        let conn = self.conn.lock().await;
        upsert(&conn, row)
    }

    /// Upsert every row inside one transaction, committed once at the end.
    /// Any failure rolls the whole batch back.
    pub async fn upsert_all(&self, rows: &[ExportRow]) -> Result<Vec<UpsertOutcome>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let outcomes = rows
            .iter()
            .map(|row| upsert(&tx, row))
            .collect::<Result<Vec<_>>>()?;

        tx.commit().context("Failed to commit export")?;
        debug!("Committed {} rows", rows.len());
        Ok(outcomes)
    }

    pub async fn count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT count(*) FROM messages", [], |row| row.get(0))
            .context("Failed to count messages")
    }

    /// Fetch a full row by id
    #[cfg(test)]
    pub async fn get(&self, message_id: i64) -> Result<Option<ExportRow>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, chat_id, message_text, date, urls FROM messages WHERE id = ?1",
            rusqlite::params![message_id],
            |row| {
                Ok(ExportRow {
                    message_id: row.get(0)?,
                    chat_id: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
                    markup: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    date: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    urls: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                })
            },
        )
        .optional()
        .context("Failed to load message")
    }
}

fn stored_urls(conn: &Connection, message_id: i64) -> Result<Option<Option<String>>> {
    conn.query_row(
        "SELECT urls FROM messages WHERE id = ?1",
        rusqlite::params![message_id],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()
    .context("Failed to look up stored urls")
}

fn upsert(conn: &Connection, row: &ExportRow) -> Result<UpsertOutcome> {
    match stored_urls(conn, row.message_id)? {
        None => {
            conn.execute(
                "INSERT INTO messages (id, chat_id, message_text, date, urls)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![row.message_id, row.chat_id, row.markup, row.date, row.urls],
            )
            .with_context(|| format!("Failed to insert message {}", row.message_id))?;
            Ok(UpsertOutcome::Inserted)
        }
        Some(existing) if existing.as_deref() != Some(row.urls.as_str()) => {
            conn.execute(
                "UPDATE messages SET urls = ?1 WHERE id = ?2",
                rusqlite::params![row.urls, row.message_id],
            )
            .with_context(|| format!("Failed to update urls for message {}", row.message_id))?;
            Ok(UpsertOutcome::UrlsUpdated)
        }
        Some(_) => Ok(UpsertOutcome::Unchanged),
    }
}

// Add any required column the existing table lacks
fn ensure_columns(conn: &Connection) -> Result<()> {
    let existing: HashSet<String> = {
        let mut stmt = conn
            .prepare("PRAGMA table_info(messages)")
            .context("Failed to read table info")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<HashSet<_>>>()
            .context("Failed to collect column names")?;
        names
    };

    for (name, column_type) in REQUIRED_COLUMNS {
        if existing.contains(*name) {
            continue;
        }
        info!("Adding missing column: {}", name);
        conn.execute_batch(&format!(
            "ALTER TABLE messages ADD COLUMN {} {}",
            name, column_type
        ))
        .with_context(|| format!("Failed to add column {}", name))?;
    }

    debug!("messages table has all required columns");
    Ok(())
}
