//! SQLite-backed durable store for the library entity graph.
//!
//! One guarded connection serializes every write, which is strictly stronger
//! than the per-item ordering the pipeline relies on. Cascading deletes are
//! explicit application-level statements inside one immediate transaction,
//! never schema-level cascade clauses, so a partial cascade cannot be
//! observed.

pub mod library;
pub mod persistence;

pub use library::{Folder, Item, ItemState, Library};
pub use persistence::PersistenceCoordinator;

use crate::error::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

const SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = "
CREATE TABLE folders (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    position    INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE items (
    id          TEXT PRIMARY KEY,
    folder_id   TEXT REFERENCES folders(id),
    name        TEXT NOT NULL,
    position    INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE audio_blobs (
    item_id     TEXT PRIMARY KEY REFERENCES items(id),
    name        TEXT NOT NULL,
    bytes       BLOB NOT NULL
);

CREATE TABLE transcripts (
    item_id     TEXT PRIMARY KEY REFERENCES items(id),
    text        TEXT NOT NULL
);

CREATE TABLE notes (
    item_id     TEXT PRIMARY KEY REFERENCES items(id),
    text        TEXT NOT NULL
);

CREATE INDEX idx_items_folder ON items(folder_id);
";

/// Shared handle to the durable store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if needed) a store file and bootstrap its schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        bootstrap(&conn)?;
        info!("Store opened at {}", path.as_ref().display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        bootstrap(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

fn bootstrap(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    let version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if version == 0 {
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!("Store schema created (version {})", SCHEMA_VERSION);
    } else if version != SCHEMA_VERSION {
        return Err(Error::Persistence(format!(
            "store schema version {} is not supported (expected {})",
            version, SCHEMA_VERSION
        )));
    }

    Ok(())
}
