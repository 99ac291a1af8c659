use crate::error::{Error, Result};
use crate::store::Store;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tracing::info;
use uuid::Uuid;

const UPSERT_TRANSCRIPT: &str = "INSERT INTO transcripts (item_id, text) VALUES (?1, ?2)
     ON CONFLICT(item_id) DO UPDATE SET text = excluded.text;";

const UPSERT_NOTE: &str = "INSERT INTO notes (item_id, text) VALUES (?1, ?2)
     ON CONFLICT(item_id) DO UPDATE SET text = excluded.text;";

/// Durable, idempotent writes of derived text.
///
/// Saving the same text twice leaves exactly one row: the item id is the
/// primary key of both text tables. Each save is one transaction, fully
/// committed or not observable at all. Writes from concurrent sessions to
/// the same item serialize on the store's connection; last committed wins.
#[derive(Clone)]
pub struct PersistenceCoordinator {
    store: Store,
}

impl PersistenceCoordinator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn save_transcript(&self, item: Uuid, text: &str) -> Result<()> {
        self.upsert(UPSERT_TRANSCRIPT, item, text).await?;
        info!("Saved transcript for item {} ({} chars)", item, text.len());
        Ok(())
    }

    pub async fn save_note(&self, item: Uuid, text: &str) -> Result<()> {
        self.upsert(UPSERT_NOTE, item, text).await?;
        info!("Saved note for item {} ({} chars)", item, text.len());
        Ok(())
    }

    async fn upsert(&self, sql: &'static str, item: Uuid, text: &str) -> Result<()> {
        let mut conn = self.store.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM items WHERE id = ?1;",
                [item.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::ItemNotFound(item));
        }

        tx.execute(sql, params![item.to_string(), text])?;
        tx.commit()?;
        Ok(())
    }
}
