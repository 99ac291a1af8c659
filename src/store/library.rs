use crate::audio::probe_decodable;
use crate::error::{Error, Result};
use crate::store::Store;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Name given to the folder auto-created when an item is requested before
/// any folder exists.
pub const DEFAULT_FOLDER_NAME: &str = "Default Folder";

/// A named, ordered collection of items.
#[derive(Debug, Clone, Serialize)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// Presence of derived data on an item, checked at stage boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    NoAudio,
    AudioOnly,
    AudioWithText,
}

/// One recording with its derived transcript/note and placement metadata.
///
/// `folder_id` is `None` only for items explicitly detached via
/// `remove_item`; every composite operation commits total placement.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: Uuid,
    pub folder_id: Option<Uuid>,
    pub name: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub state: ItemState,
}

/// The folder/item hierarchy and its integrity rules.
///
/// All mutations that touch more than one row run inside one immediate
/// transaction; moves and cascades are atomic as observed through any
/// other handle to the same store.
#[derive(Clone)]
pub struct Library {
    store: Store,
}

impl Library {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    // ------------------------------------------------------------------
    // Folders
    // ------------------------------------------------------------------

    pub async fn create_folder(&self, name: &str) -> Result<Folder> {
        let conn = self.store.lock().await;
        let folder = insert_folder(&conn, name)?;
        info!("Created folder {} ({})", folder.name, folder.id);
        Ok(folder)
    }

    pub async fn rename_folder(&self, id: Uuid, name: &str) -> Result<()> {
        let conn = self.store.lock().await;
        let changed = conn.execute(
            "UPDATE folders SET name = ?2 WHERE id = ?1;",
            params![id.to_string(), name],
        )?;
        if changed == 0 {
            return Err(Error::FolderNotFound(id));
        }
        Ok(())
    }

    /// Delete a folder and cascade to every item it owns, including their
    /// audio, transcript, and note rows. All-or-nothing.
    pub async fn delete_folder(&self, id: Uuid) -> Result<()> {
        let mut conn = self.store.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        ensure_folder_exists(&tx, id)?;

        tx.execute(
            "DELETE FROM notes WHERE item_id IN (SELECT id FROM items WHERE folder_id = ?1);",
            [id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM transcripts WHERE item_id IN (SELECT id FROM items WHERE folder_id = ?1);",
            [id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM audio_blobs WHERE item_id IN (SELECT id FROM items WHERE folder_id = ?1);",
            [id.to_string()],
        )?;
        let items = tx.execute("DELETE FROM items WHERE folder_id = ?1;", [id.to_string()])?;
        tx.execute("DELETE FROM folders WHERE id = ?1;", [id.to_string()])?;

        tx.commit()?;
        info!("Deleted folder {} and {} owned items", id, items);
        Ok(())
    }

    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        let conn = self.store.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, name, position, created_at
             FROM folders
             ORDER BY position ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut folders = Vec::new();
        while let Some(row) = rows.next()? {
            folders.push(parse_folder_row(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
            )?);
        }
        Ok(folders)
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Create an item, placing it in the given folder. With no destination
    /// it lands in the first folder, auto-creating the default folder when
    /// the library has none.
    pub async fn create_item(&self, name: &str, folder: Option<Uuid>) -> Result<Item> {
        let mut conn = self.store.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let folder_id = match folder {
            Some(id) => {
                ensure_folder_exists(&tx, id)?;
                id
            }
            None => match first_folder_id(&tx)? {
                Some(id) => id,
                None => {
                    let default = insert_folder(&tx, DEFAULT_FOLDER_NAME)?;
                    info!("Auto-created folder \"{}\"", DEFAULT_FOLDER_NAME);
                    default.id
                }
            },
        };

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let position = next_item_position(&tx, folder_id)?;
        tx.execute(
            "INSERT INTO items (id, folder_id, name, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                folder_id.to_string(),
                name,
                position,
                created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        info!("Created item {} ({}) in folder {}", name, id, folder_id);

        Ok(Item {
            id,
            folder_id: Some(folder_id),
            name: name.to_string(),
            position,
            created_at,
            state: ItemState::NoAudio,
        })
    }

    pub async fn get_item(&self, id: Uuid) -> Result<Item> {
        let conn = self.store.lock().await;
        load_item(&conn, id)?.ok_or(Error::ItemNotFound(id))
    }

    pub async fn list_items(&self, folder: Uuid) -> Result<Vec<Item>> {
        let conn = self.store.lock().await;
        ensure_folder_exists(&conn, folder)?;

        let mut stmt = conn.prepare(&format!(
            "{ITEM_SELECT} WHERE i.folder_id = ?1 ORDER BY i.position ASC, i.id ASC;"
        ))?;
        let mut rows = stmt.query([folder.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    /// Rename changes the display name only; identity and ownership are
    /// untouched.
    pub async fn rename_item(&self, id: Uuid, name: &str) -> Result<()> {
        let conn = self.store.lock().await;
        let changed = conn.execute(
            "UPDATE items SET name = ?2 WHERE id = ?1;",
            params![id.to_string(), name],
        )?;
        if changed == 0 {
            return Err(Error::ItemNotFound(id));
        }
        Ok(())
    }

    /// Attach an item to a folder, appending it to the folder's order.
    pub async fn add_item(&self, item: Uuid, folder: Uuid) -> Result<()> {
        let mut conn = self.store.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        ensure_folder_exists(&tx, folder)?;
        let position = next_item_position(&tx, folder)?;
        let changed = tx.execute(
            "UPDATE items SET folder_id = ?2, position = ?3 WHERE id = ?1;",
            params![item.to_string(), folder.to_string(), position],
        )?;
        if changed == 0 {
            return Err(Error::ItemNotFound(item));
        }

        tx.commit()?;
        Ok(())
    }

    /// Detach an item from a folder without destroying it. The item keeps
    /// its audio and text; use `delete_item` for destruction.
    pub async fn remove_item(&self, item: Uuid, folder: Uuid) -> Result<()> {
        let conn = self.store.lock().await;
        let changed = conn.execute(
            "UPDATE items SET folder_id = NULL WHERE id = ?1 AND folder_id = ?2;",
            params![item.to_string(), folder.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::ItemNotFound(item));
        }
        Ok(())
    }

    /// Atomically move an item between folders. At no observable point is
    /// the item in neither or both; `to == from` is a no-op.
    pub async fn move_item(&self, item: Uuid, from: Uuid, to: Uuid) -> Result<()> {
        if to == from {
            return Ok(());
        }

        let mut conn = self.store.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        ensure_folder_exists(&tx, to)?;
        let position = next_item_position(&tx, to)?;
        let changed = tx.execute(
            "UPDATE items SET folder_id = ?2, position = ?3
             WHERE id = ?1 AND folder_id = ?4;",
            params![
                item.to_string(),
                to.to_string(),
                position,
                from.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::ItemNotFound(item));
        }

        tx.commit()?;
        info!("Moved item {} from {} to {}", item, from, to);
        Ok(())
    }

    /// Delete an item and cascade to its audio, transcript, and note rows.
    pub async fn delete_item(&self, item: Uuid, folder: Uuid) -> Result<()> {
        let mut conn = self.store.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let owned: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM items WHERE id = ?1 AND folder_id = ?2;",
                params![item.to_string(), folder.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(Error::ItemNotFound(item));
        }

        tx.execute("DELETE FROM notes WHERE item_id = ?1;", [item.to_string()])?;
        tx.execute(
            "DELETE FROM transcripts WHERE item_id = ?1;",
            [item.to_string()],
        )?;
        tx.execute(
            "DELETE FROM audio_blobs WHERE item_id = ?1;",
            [item.to_string()],
        )?;
        tx.execute("DELETE FROM items WHERE id = ?1;", [item.to_string()])?;

        tx.commit()?;
        info!("Deleted item {}", item);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Owned data
    // ------------------------------------------------------------------

    /// Attach an audio blob to an item, replacing any previous one. The
    /// bytes are validated decodable before acceptance.
    pub async fn attach_audio(&self, item: Uuid, name: &str, bytes: &[u8]) -> Result<()> {
        probe_decodable(bytes, name)?;

        let mut conn = self.store.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        ensure_item_exists(&tx, item)?;
        tx.execute(
            "INSERT INTO audio_blobs (item_id, name, bytes) VALUES (?1, ?2, ?3)
             ON CONFLICT(item_id) DO UPDATE SET name = excluded.name, bytes = excluded.bytes;",
            params![item.to_string(), name, bytes],
        )?;

        tx.commit()?;
        info!("Attached {} byte blob \"{}\" to item {}", bytes.len(), name, item);
        Ok(())
    }

    pub async fn load_audio(&self, item: Uuid) -> Result<Option<(String, Vec<u8>)>> {
        let conn = self.store.lock().await;
        ensure_item_exists(&conn, item)?;
        let blob = conn
            .query_row(
                "SELECT name, bytes FROM audio_blobs WHERE item_id = ?1;",
                [item.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(blob)
    }

    pub async fn load_transcript(&self, item: Uuid) -> Result<Option<String>> {
        self.load_text("SELECT text FROM transcripts WHERE item_id = ?1;", item)
            .await
    }

    pub async fn load_note(&self, item: Uuid) -> Result<Option<String>> {
        self.load_text("SELECT text FROM notes WHERE item_id = ?1;", item)
            .await
    }

    pub async fn item_state(&self, item: Uuid) -> Result<ItemState> {
        Ok(self.get_item(item).await?.state)
    }

    async fn load_text(&self, sql: &'static str, item: Uuid) -> Result<Option<String>> {
        let conn = self.store.lock().await;
        ensure_item_exists(&conn, item)?;
        let text = conn
            .query_row(sql, [item.to_string()], |row| row.get(0))
            .optional()?;
        Ok(text)
    }
}

const ITEM_SELECT: &str = "SELECT i.id, i.folder_id, i.name, i.position, i.created_at,
        a.item_id IS NOT NULL,
        t.item_id IS NOT NULL OR n.item_id IS NOT NULL
     FROM items i
     LEFT JOIN audio_blobs a ON a.item_id = i.id
     LEFT JOIN transcripts t ON t.item_id = i.id
     LEFT JOIN notes n ON n.item_id = i.id";

fn insert_folder(conn: &Connection, name: &str) -> Result<Folder> {
    let id = Uuid::new_v4();
    let created_at = Utc::now();
    let position: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM folders;",
        [],
        |row| row.get(0),
    )?;
    conn.execute(
        "INSERT INTO folders (id, name, position, created_at) VALUES (?1, ?2, ?3, ?4);",
        params![id.to_string(), name, position, created_at.to_rfc3339()],
    )?;
    Ok(Folder {
        id,
        name: name.to_string(),
        position,
        created_at,
    })
}

fn first_folder_id(conn: &Connection) -> Result<Option<Uuid>> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM folders ORDER BY position ASC, id ASC LIMIT 1;",
            [],
            |row| row.get(0),
        )
        .optional()?;
    id.map(|value| parse_uuid(&value)).transpose()
}

fn next_item_position(conn: &Connection, folder: Uuid) -> Result<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM items WHERE folder_id = ?1;",
        [folder.to_string()],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn ensure_folder_exists(conn: &Connection, id: Uuid) -> Result<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM folders WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(Error::FolderNotFound(id));
    }
    Ok(())
}

fn ensure_item_exists(conn: &Connection, id: Uuid) -> Result<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(Error::ItemNotFound(id));
    }
    Ok(())
}

fn load_item(conn: &Connection, id: Uuid) -> Result<Option<Item>> {
    let mut stmt = conn.prepare(&format!("{ITEM_SELECT} WHERE i.id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_item_row(row)?)),
        None => Ok(None),
    }
}

fn parse_item_row(row: &rusqlite::Row<'_>) -> Result<Item> {
    let id: String = row.get(0)?;
    let folder_id: Option<String> = row.get(1)?;
    let has_audio: bool = row.get(5)?;
    let has_text: bool = row.get(6)?;

    let state = match (has_audio, has_text) {
        (false, _) => ItemState::NoAudio,
        (true, false) => ItemState::AudioOnly,
        (true, true) => ItemState::AudioWithText,
    };

    Ok(Item {
        id: parse_uuid(&id)?,
        folder_id: folder_id.map(|value| parse_uuid(&value)).transpose()?,
        name: row.get(2)?,
        position: row.get(3)?,
        created_at: parse_timestamp(&row.get::<_, String>(4)?)?,
        state,
    })
}

fn parse_folder_row(id: String, name: String, position: i64, created_at: String) -> Result<Folder> {
    Ok(Folder {
        id: parse_uuid(&id)?,
        name,
        position,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|_| Error::Persistence(format!("invalid uuid `{value}`")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::Persistence(format!("invalid timestamp `{value}`")))
}
