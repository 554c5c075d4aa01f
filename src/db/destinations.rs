use deadpool_postgres::Pool;

use crate::db::models::{Destination, DestinationType};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct DestinationRepo {
    pool: Pool,
}

impl DestinationRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_destination(row: &tokio_postgres::Row) -> Destination {
        let type_str: String = row.get("destination_type");
        Destination {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            destination_id: row.get("destination_id"),
            destination_name: row.get("destination_name"),
            destination_type: DestinationType::parse(&type_str).unwrap_or(DestinationType::Channel),
            description: row.get("description"),
            message_count: row.get("message_count"),
            last_forwarded: row.get("last_forwarded"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        }
    }

    pub async fn list(&self, tenant_id: i32) -> AppResult<Vec<Destination>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM destinations WHERE tenant_id = $1 ORDER BY id",
                &[&tenant_id],
            )
            .await?;
        Ok(rows.iter().map(Self::row_to_destination).collect())
    }

    pub async fn get(&self, tenant_id: i32, id: i32) -> AppResult<Destination> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM destinations WHERE id = $1 AND tenant_id = $2",
                &[&id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("destination not found".into()))?;
        Ok(Self::row_to_destination(&row))
    }

    pub async fn create(
        &self,
        tenant_id: i32,
        destination_id: &str,
        destination_name: &str,
        destination_type: DestinationType,
        description: Option<&str>,
    ) -> AppResult<Destination> {
        let client = self.pool.get().await?;
        let existing = client
            .query_opt(
                "SELECT id FROM destinations WHERE tenant_id = $1 AND destination_id = $2",
                &[&tenant_id, &destination_id],
            )
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("destination already registered".into()));
        }
        let row = client
            .query_one(
                "INSERT INTO destinations (tenant_id, destination_id, destination_name, destination_type, description)
                 VALUES ($1, $2, $3, $4, $5) RETURNING *",
                &[&tenant_id, &destination_id, &destination_name, &destination_type.as_str(), &description],
            )
            .await?;
        Ok(Self::row_to_destination(&row))
    }

    pub async fn update(
        &self,
        tenant_id: i32,
        id: i32,
        destination_name: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<Destination> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE destinations SET
                    destination_name = COALESCE($3, destination_name),
                    description = COALESCE($4, description)
                 WHERE id = $1 AND tenant_id = $2 RETURNING *",
                &[&id, &tenant_id, &destination_name, &description],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("destination not found".into()))?;
        Ok(Self::row_to_destination(&row))
    }

    pub async fn deactivate(&self, tenant_id: i32, id: i32) -> AppResult<Destination> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE destinations SET is_active = FALSE WHERE id = $1 AND tenant_id = $2 RETURNING *",
                &[&id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("destination not found".into()))?;
        Ok(Self::row_to_destination(&row))
    }

    pub async fn record_forward(&self, tenant_id: i32, id: i32) -> AppResult<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE destinations SET message_count = message_count + 1, last_forwarded = NOW()
                 WHERE id = $1 AND tenant_id = $2",
                &[&id, &tenant_id],
            )
            .await?;
        Ok(())
    }
}
