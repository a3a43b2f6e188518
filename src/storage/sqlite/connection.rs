use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::errors::{FeederError, FeederResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    feed_url TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    categories TEXT NOT NULL DEFAULT '[]',
    link TEXT NOT NULL UNIQUE,
    summary TEXT NOT NULL DEFAULT '',
    pub_date INTEGER NOT NULL,
    published INTEGER NOT NULL DEFAULT 0,
    generated_summary TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    published_at INTEGER,
    FOREIGN KEY (source_id) REFERENCES sources(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_articles_unpublished ON articles(published, pub_date);
"#;

/// Single SQLite connection shared by every repository.
///
/// rusqlite is blocking, so async callers go through [`SqliteStorage::call`]
/// which runs the closure on tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> FeederResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> FeederResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> FeederResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, FeederError> {
        self.conn
            .lock()
            .map_err(|_| FeederError::Task("database lock poisoned".to_string()))
    }

    pub async fn call<F, T>(&self, f: F) -> FeederResult<T>
    where
        F: FnOnce(&Connection) -> FeederResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = storage.connection()?;
            f(&conn)
        })
        .await?
    }
}
