use std::collections::HashMap;

use deadpool_postgres::Pool;

use crate::db::models::{IngestedVia, MessageLog, MessageType};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct MessageRepo {
    pool: Pool,
}

pub struct NewMessageLog<'a> {
    pub tenant_id: i32,
    pub group_id: i32,
    pub group_name: &'a str,
    pub user_id: Option<i64>,
    pub username: Option<&'a str>,
    pub message_id: i64,
    pub message_text: Option<&'a str>,
    pub message_type: MessageType,
    pub media_info: &'a HashMap<String, serde_json::Value>,
    pub matched_keywords: &'a [String],
    pub ingested_via: IngestedVia,
}

impl MessageRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_message(row: &tokio_postgres::Row) -> MessageLog {
        let type_str: String = row.get("message_type");
        let via_str: String = row.get("ingested_via");
        let media_info: serde_json::Value = row.get("media_info");
        let matched_keywords: serde_json::Value = row.get("matched_keywords");
        MessageLog {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            group_id: row.get("group_id"),
            group_name: row.get("group_name"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            message_id: row.get("message_id"),
            message_text: row.get("message_text"),
            message_type: MessageType::parse(&type_str).unwrap_or(MessageType::Other),
            media_info: serde_json::from_value(media_info).unwrap_or_default(),
            matched_keywords: crate::db::json_to_vec(matched_keywords),
            timestamp: row.get("timestamp"),
            ingested_via: IngestedVia::parse(&via_str).unwrap_or(IngestedVia::Session),
        }
    }

    /// inserts a message log, returning `Ok(None)` if `(tenant_id, group_id,
    /// message_id)` already exists rather than erroring — the pipeline treats
    /// a duplicate ingest as a no-op, not a failure.
    pub async fn insert_if_new(&self, entry: NewMessageLog<'_>) -> AppResult<Option<MessageLog>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "INSERT INTO message_logs
                    (tenant_id, group_id, group_name, user_id, username, message_id,
                     message_text, message_type, media_info, matched_keywords, ingested_via)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 ON CONFLICT (tenant_id, group_id, message_id) DO NOTHING
                 RETURNING *",
                &[
                    &entry.tenant_id,
                    &entry.group_id,
                    &entry.group_name,
                    &entry.user_id,
                    &entry.username,
                    &entry.message_id,
                    &entry.message_text,
                    &entry.message_type.as_str(),
                    &serde_json::to_value(entry.media_info)?,
                    &serde_json::to_value(entry.matched_keywords)?,
                    &entry.ingested_via.as_str(),
                ],
            )
            .await?;
        Ok(row.map(|r| Self::row_to_message(&r)))
    }

    pub async fn get(&self, tenant_id: i32, id: i32) -> AppResult<MessageLog> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM message_logs WHERE id = $1 AND tenant_id = $2",
                &[&id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("message not found".into()))?;
        Ok(Self::row_to_message(&row))
    }

    pub async fn list(
        &self,
        tenant_id: i32,
        username: Option<&str>,
        group_id: Option<i32>,
        message_type: Option<MessageType>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<MessageLog>> {
        let client = self.pool.get().await?;
        let message_type = message_type.map(|t| t.as_str());
        let rows = client
            .query(
                "SELECT * FROM message_logs
                 WHERE tenant_id = $1
                   AND ($2::VARCHAR IS NULL OR username = $2)
                   AND ($3::INTEGER IS NULL OR group_id = $3)
                   AND ($4::VARCHAR IS NULL OR message_type = $4)
                 ORDER BY timestamp DESC
                 LIMIT $5 OFFSET $6",
                &[&tenant_id, &username, &group_id, &message_type, &limit, &offset],
            )
            .await?;
        Ok(rows.iter().map(Self::row_to_message).collect())
    }

    /// substring scan over text/username/group_name for `/messages/search?q=`.
    /// Not index-backed; acceptable at this service's expected message volume.
    pub async fn search(&self, tenant_id: i32, query: &str, limit: i64, offset: i64) -> AppResult<Vec<MessageLog>> {
        let client = self.pool.get().await?;
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let rows = client
            .query(
                "SELECT * FROM message_logs
                 WHERE tenant_id = $1
                   AND (message_text ILIKE $2 OR username ILIKE $2 OR group_name ILIKE $2)
                 ORDER BY timestamp DESC
                 LIMIT $3 OFFSET $4",
                &[&tenant_id, &pattern, &limit, &offset],
            )
            .await?;
        Ok(rows.iter().map(Self::row_to_message).collect())
    }

    pub async fn count_since(&self, tenant_id: i32, since: chrono::DateTime<chrono::Utc>) -> AppResult<i64> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM message_logs WHERE tenant_id = $1 AND timestamp >= $2",
                &[&tenant_id, &since],
            )
            .await?;
        Ok(row.get(0))
    }
}
