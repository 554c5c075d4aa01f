use deadpool_postgres::Pool;

use crate::db::models::{Organization, Plan};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct OrganizationRepo {
    pool: Pool,
}

impl OrganizationRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_org(row: &tokio_postgres::Row) -> Organization {
        let plan_str: String = row.get("plan");
        Organization {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            plan: Plan::parse(&plan_str).unwrap_or(Plan::Free),
            usage_stats: row.get("usage_stats"),
            created_at: row.get("created_at"),
        }
    }

    /// creates a new tenant, used only from registration
    pub async fn create(&self, name: &str) -> AppResult<Organization> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO organizations (name) VALUES ($1) RETURNING *",
                &[&name],
            )
            .await?;
        Ok(Self::row_to_org(&row))
    }

    pub async fn get(&self, tenant_id: i32) -> AppResult<Organization> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM organizations WHERE id = $1", &[&tenant_id])
            .await?
            .ok_or_else(|| AppError::NotFound("organization not found".into()))?;
        Ok(Self::row_to_org(&row))
    }

    pub async fn update_plan(&self, tenant_id: i32, plan: Plan) -> AppResult<Organization> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE organizations SET plan = $2 WHERE id = $1 RETURNING *",
                &[&tenant_id, &plan.as_str()],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("organization not found".into()))?;
        Ok(Self::row_to_org(&row))
    }

    pub async fn update_profile(
        &self,
        tenant_id: i32,
        name: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<Organization> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE organizations SET
                    name = COALESCE($2, name),
                    description = COALESCE($3, description)
                 WHERE id = $1 RETURNING *",
                &[&tenant_id, &name, &description],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("organization not found".into()))?;
        Ok(Self::row_to_org(&row))
    }
}
