// SQLite DurableQueue Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use courier_core::domain::{MessageId, QueueMessage, QueueStats};
use courier_core::error::{AppError, Result};
use courier_core::port::{DurableQueue, IdProvider, QueueInspector, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct SqliteQueue {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    visibility_timeout: Duration,
}

impl SqliteQueue {
    pub fn new(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        visibility_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            time_provider,
            id_provider,
            visibility_timeout,
        }
    }

    pub fn visibility_timeout(&self) -> Duration {
        self.visibility_timeout
    }
}

#[async_trait]
impl QueueInspector for SqliteQueue {
    async fn stats(&self) -> Result<QueueStats> {
        let now = self.time_provider.now_millis();
        let (total, visible): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN visible_at <= ? THEN 1 ELSE 0 END), 0)
            FROM callback_messages
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(QueueStats {
            total,
            visible,
            in_flight: total - visible,
        })
    }
}

fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl DurableQueue for SqliteQueue {
    async fn send(&self, body: &[u8]) -> Result<MessageId> {
        let id = self.id_provider.generate_id();
        let now = self.time_provider.now_millis();

        sqlx::query(
            r#"
            INSERT INTO callback_messages (id, body, created_at, visible_at, receive_count)
            VALUES (?, ?, ?, ?, 0)
            "#,
        )
        .bind(&id)
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(id)
    }

    async fn receive(&self) -> Result<Option<QueueMessage>> {
        let now = self.time_provider.now_millis();
        let hidden_until = now.saturating_add(duration_millis(self.visibility_timeout));

        // One statement: the write lock covers both selection and update
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            UPDATE callback_messages
            SET visible_at = ?, receive_count = receive_count + 1
            WHERE id = (
                SELECT id FROM callback_messages
                WHERE visible_at <= ?
                ORDER BY visible_at ASC, created_at ASC, id ASC
                LIMIT 1
            )
            RETURNING id, body, receive_count
            "#,
        )
        .bind(hidden_until)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MessageRow::into_message))
    }

    async fn delete(&self, id: &MessageId) -> Result<()> {
        let result = sqlx::query("DELETE FROM callback_messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            debug!(message_id = %id, "Delete of unknown message ignored");
        }
        Ok(())
    }

    async fn extend(&self, id: &MessageId, duration: Duration) -> Result<()> {
        let visible_at = self
            .time_provider
            .now_millis()
            .saturating_add(duration_millis(duration));

        let result = sqlx::query("UPDATE callback_messages SET visible_at = ? WHERE id = ?")
            .bind(visible_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Message {} not found", id)));
        }
        Ok(())
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: String,
    body: Vec<u8>,
    receive_count: i64,
}

impl MessageRow {
    fn into_message(self) -> QueueMessage {
        QueueMessage::new(
            self.id,
            self.body,
            u32::try_from(self.receive_count).unwrap_or(u32::MAX),
        )
    }
}
