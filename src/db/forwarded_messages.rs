use deadpool_postgres::Pool;

use crate::db::models::{ForwardOutcome, ForwardedMessage};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ForwardedMessageRepo {
    pool: Pool,
}

impl ForwardedMessageRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_forwarded(row: &tokio_postgres::Row) -> ForwardedMessage {
        let outcome_str: String = row.get("outcome");
        ForwardedMessage {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            source_message_ref: row.get("source_message_ref"),
            username: row.get("username"),
            group_name: row.get("group_name"),
            destination_id: row.get("destination_id"),
            forwarded_at: row.get("forwarded_at"),
            outcome: ForwardOutcome::parse(&outcome_str).unwrap_or(ForwardOutcome::Failed),
            failure_reason: row.get("failure_reason"),
        }
    }

    pub async fn record(
        &self,
        tenant_id: i32,
        source_message_ref: i32,
        username: Option<&str>,
        group_name: &str,
        destination_id: i32,
        outcome: ForwardOutcome,
        failure_reason: Option<&str>,
    ) -> AppResult<ForwardedMessage> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO forwarded_messages
                    (tenant_id, source_message_ref, username, group_name, destination_id, outcome, failure_reason)
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
                &[
                    &tenant_id,
                    &source_message_ref,
                    &username,
                    &group_name,
                    &destination_id,
                    &outcome.as_str(),
                    &failure_reason,
                ],
            )
            .await?;
        Ok(Self::row_to_forwarded(&row))
    }

    pub async fn list(
        &self,
        tenant_id: i32,
        username: Option<&str>,
        destination_id: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<ForwardedMessage>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM forwarded_messages
                 WHERE tenant_id = $1
                   AND ($2::VARCHAR IS NULL OR username = $2)
                   AND ($3::INTEGER IS NULL OR destination_id = $3)
                 ORDER BY forwarded_at DESC
                 LIMIT $4 OFFSET $5",
                &[&tenant_id, &username, &destination_id, &limit, &offset],
            )
            .await?;
        Ok(rows.iter().map(Self::row_to_forwarded).collect())
    }

    pub async fn get(&self, tenant_id: i32, id: i32) -> AppResult<ForwardedMessage> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM forwarded_messages WHERE id = $1 AND tenant_id = $2",
                &[&id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("forwarded message not found".into()))?;
        Ok(Self::row_to_forwarded(&row))
    }
}
