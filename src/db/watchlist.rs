use deadpool_postgres::Pool;

use crate::db::models::WatchUser;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct WatchlistRepo {
    pool: Pool,
}

impl WatchlistRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_watch_user(row: &tokio_postgres::Row) -> WatchUser {
        let group_ids: serde_json::Value = row.get("group_ids");
        let keywords: serde_json::Value = row.get("keywords");
        let destinations: serde_json::Value = row.get("forwarding_destination_ids");
        WatchUser {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            username: row.get("username"),
            user_id: row.get("user_id"),
            full_name: row.get("full_name"),
            group_ids: crate::db::json_to_vec(group_ids),
            keywords: crate::db::json_to_vec(keywords),
            forwarding_destination_ids: crate::db::json_to_vec(destinations),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        }
    }

    pub async fn list(&self, tenant_id: i32) -> AppResult<Vec<WatchUser>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM watch_users WHERE tenant_id = $1 ORDER BY id",
                &[&tenant_id],
            )
            .await?;
        Ok(rows.iter().map(Self::row_to_watch_user).collect())
    }

    pub async fn list_active(&self, tenant_id: i32) -> AppResult<Vec<WatchUser>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM watch_users WHERE tenant_id = $1 AND is_active = TRUE ORDER BY id",
                &[&tenant_id],
            )
            .await?;
        Ok(rows.iter().map(Self::row_to_watch_user).collect())
    }

    pub async fn get(&self, tenant_id: i32, id: i32) -> AppResult<WatchUser> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM watch_users WHERE id = $1 AND tenant_id = $2",
                &[&id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("watch user not found".into()))?;
        Ok(Self::row_to_watch_user(&row))
    }

    pub async fn create(
        &self,
        tenant_id: i32,
        username: &str,
        full_name: Option<&str>,
        group_ids: &[i32],
        keywords: &[String],
        forwarding_destination_ids: &[i32],
    ) -> AppResult<WatchUser> {
        let normalized = WatchUser::normalize_username(username);
        let client = self.pool.get().await?;
        let existing = client
            .query_opt(
                "SELECT id FROM watch_users WHERE tenant_id = $1 AND username = $2",
                &[&tenant_id, &normalized],
            )
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("watch user already exists".into()));
        }
        let row = client
            .query_one(
                "INSERT INTO watch_users (tenant_id, username, full_name, group_ids, keywords, forwarding_destination_ids)
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
                &[
                    &tenant_id,
                    &normalized,
                    &full_name,
                    &serde_json::to_value(group_ids)?,
                    &serde_json::to_value(keywords)?,
                    &serde_json::to_value(forwarding_destination_ids)?,
                ],
            )
            .await?;
        Ok(Self::row_to_watch_user(&row))
    }

    pub async fn update(
        &self,
        tenant_id: i32,
        id: i32,
        group_ids: Option<&[i32]>,
        keywords: Option<&[String]>,
        forwarding_destination_ids: Option<&[i32]>,
    ) -> AppResult<WatchUser> {
        let current = self.get(tenant_id, id).await?;
        let group_ids = group_ids.unwrap_or(&current.group_ids);
        let keywords = keywords.unwrap_or(&current.keywords);
        let forwarding_destination_ids =
            forwarding_destination_ids.unwrap_or(&current.forwarding_destination_ids);

        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE watch_users SET group_ids = $3, keywords = $4, forwarding_destination_ids = $5
                 WHERE id = $1 AND tenant_id = $2 RETURNING *",
                &[
                    &id,
                    &tenant_id,
                    &serde_json::to_value(group_ids)?,
                    &serde_json::to_value(keywords)?,
                    &serde_json::to_value(forwarding_destination_ids)?,
                ],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("watch user not found".into()))?;
        Ok(Self::row_to_watch_user(&row))
    }

    pub async fn deactivate(&self, tenant_id: i32, id: i32) -> AppResult<WatchUser> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE watch_users SET is_active = FALSE WHERE id = $1 AND tenant_id = $2 RETURNING *",
                &[&id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("watch user not found".into()))?;
        Ok(Self::row_to_watch_user(&row))
    }

}
