use deadpool_postgres::Pool;

use crate::db::models::{Group, GroupType};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct GroupRepo {
    pool: Pool,
}

impl GroupRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_group(row: &tokio_postgres::Row) -> Group {
        let type_str: String = row.get("group_type");
        Group {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            group_id: row.get("group_id"),
            group_name: row.get("group_name"),
            group_type: GroupType::parse(&type_str).unwrap_or(GroupType::Group),
            invite_link: row.get("invite_link"),
            description: row.get("description"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        }
    }

    pub async fn list(&self, tenant_id: i32) -> AppResult<Vec<Group>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM groups WHERE tenant_id = $1 ORDER BY id",
                &[&tenant_id],
            )
            .await?;
        Ok(rows.iter().map(Self::row_to_group).collect())
    }

    pub async fn get(&self, tenant_id: i32, id: i32) -> AppResult<Group> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM groups WHERE id = $1 AND tenant_id = $2",
                &[&id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("group not found".into()))?;
        Ok(Self::row_to_group(&row))
    }

    pub async fn find_by_group_id(&self, tenant_id: i32, group_id: &str) -> AppResult<Option<Group>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM groups WHERE tenant_id = $1 AND group_id = $2",
                &[&tenant_id, &group_id],
            )
            .await?;
        Ok(row.map(|r| Self::row_to_group(&r)))
    }

    pub async fn create(
        &self,
        tenant_id: i32,
        group_id: &str,
        group_name: &str,
        group_type: GroupType,
        invite_link: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<Group> {
        let client = self.pool.get().await?;
        let existing = client
            .query_opt(
                "SELECT id FROM groups WHERE tenant_id = $1 AND group_id = $2",
                &[&tenant_id, &group_id],
            )
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("group already registered".into()));
        }
        let row = client
            .query_one(
                "INSERT INTO groups (tenant_id, group_id, group_name, group_type, invite_link, description)
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
                &[&tenant_id, &group_id, &group_name, &group_type.as_str(), &invite_link, &description],
            )
            .await?;
        Ok(Self::row_to_group(&row))
    }

    pub async fn update(
        &self,
        tenant_id: i32,
        id: i32,
        group_name: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<Group> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE groups SET
                    group_name = COALESCE($3, group_name),
                    description = COALESCE($4, description)
                 WHERE id = $1 AND tenant_id = $2 RETURNING *",
                &[&id, &tenant_id, &group_name, &description],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("group not found".into()))?;
        Ok(Self::row_to_group(&row))
    }

    pub async fn deactivate(&self, tenant_id: i32, id: i32) -> AppResult<Group> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE groups SET is_active = FALSE WHERE id = $1 AND tenant_id = $2 RETURNING *",
                &[&id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("group not found".into()))?;
        Ok(Self::row_to_group(&row))
    }
}
