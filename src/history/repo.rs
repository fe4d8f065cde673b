use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{HistoryRecord, HistoryRow, NewHistory};

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert(&self, new: NewHistory) -> anyhow::Result<HistoryRecord>;
    /// The user's records, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<HistoryRecord>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<HistoryRecord>>;
    /// Returns `false` when no such record existed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgHistoryStore {
    db: PgPool,
}

impl PgHistoryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn insert(&self, new: NewHistory) -> anyhow::Result<HistoryRecord> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            INSERT INTO history (id, user_id, outfit, image_key)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, outfit, image_key, created_at
            "#,
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(Json(new.outfit))
        .bind(new.image_key.as_deref())
        .fetch_one(&self.db)
        .await
        .context("insert history")?;
        Ok(row.into())
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<HistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, user_id, outfit, image_key, created_at
            FROM history
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list history by user")?;
        Ok(rows.into_iter().map(HistoryRecord::from).collect())
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<HistoryRecord>> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, user_id, outfit, image_key, created_at
            FROM history
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find history")?;
        Ok(row.map(HistoryRecord::from))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM history WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete history")?;
        Ok(res.rows_affected() > 0)
    }
}

/// History kept in process memory, in insertion order.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Vec<HistoryRecord>>> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("history store lock poisoned"))
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn insert(&self, new: NewHistory) -> anyhow::Result<HistoryRecord> {
        let record = HistoryRecord {
            id: new.id,
            user_id: new.user_id,
            outfit: new.outfit,
            image_key: new.image_key,
            created_at: OffsetDateTime::now_utc(),
        };
        self.lock()?.push(record.clone());
        Ok(record)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<HistoryRecord>> {
        // Reverse before the stable sort so equal timestamps stay newest first.
        let mut out: Vec<HistoryRecord> = self
            .lock()?
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<HistoryRecord>> {
        Ok(self.lock()?.iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}
