use deadpool_postgres::Pool;

use crate::db::models::{Account, AccountStatus};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AccountRepo {
    pool: Pool,
}

impl AccountRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_account(row: &tokio_postgres::Row) -> Account {
        let status_str: String = row.get("status");
        let assigned: serde_json::Value = row.get("assigned_group_ids");
        Account {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            name: row.get("name"),
            session_artifact_path: row.get("session_artifact_path"),
            metadata_artifact_path: row.get("metadata_artifact_path"),
            phone_number: row.get("phone_number"),
            username: row.get("username"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            status: AccountStatus::parse(&status_str).unwrap_or(AccountStatus::Pending),
            last_error: row.get("last_error"),
            assigned_group_ids: crate::db::json_to_vec(assigned),
            created_at: row.get("created_at"),
            last_activity: row.get("last_activity"),
        }
    }

    pub async fn list(&self, tenant_id: i32) -> AppResult<Vec<Account>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM accounts WHERE tenant_id = $1 ORDER BY id",
                &[&tenant_id],
            )
            .await?;
        Ok(rows.iter().map(Self::row_to_account).collect())
    }

    /// all active accounts across every tenant, used by the session supervisor at boot.
    pub async fn list_all_active(&self) -> AppResult<Vec<Account>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM accounts WHERE status != 'inactive' ORDER BY tenant_id, id",
                &[],
            )
            .await?;
        Ok(rows.iter().map(Self::row_to_account).collect())
    }

    pub async fn get(&self, tenant_id: i32, id: i32) -> AppResult<Account> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM accounts WHERE id = $1 AND tenant_id = $2",
                &[&id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("account not found".into()))?;
        Ok(Self::row_to_account(&row))
    }

    /// tenant-agnostic lookup used by the session supervisor, which only
    /// ever learns an account id (never a tenant) from the accounts table.
    pub async fn get_by_id(&self, id: i32) -> AppResult<Account> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM accounts WHERE id = $1", &[&id])
            .await?
            .ok_or_else(|| AppError::NotFound("account not found".into()))?;
        Ok(Self::row_to_account(&row))
    }

    pub async fn create(
        &self,
        tenant_id: i32,
        name: &str,
        session_artifact_path: &str,
        metadata_artifact_path: &str,
    ) -> AppResult<Account> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO accounts (tenant_id, name, session_artifact_path, metadata_artifact_path)
                 VALUES ($1, $2, $3, $4) RETURNING *",
                &[&tenant_id, &name, &session_artifact_path, &metadata_artifact_path],
            )
            .await?;
        Ok(Self::row_to_account(&row))
    }

    pub async fn update_identity(
        &self,
        id: i32,
        phone_number: Option<&str>,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> AppResult<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE accounts SET phone_number = $2, username = $3, first_name = $4, last_name = $5
                 WHERE id = $1",
                &[&id, &phone_number, &username, &first_name, &last_name],
            )
            .await?;
        Ok(())
    }

    pub async fn update_status(&self, id: i32, status: AccountStatus, last_error: Option<&str>) -> AppResult<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE accounts SET status = $2, last_error = $3, last_activity = NOW() WHERE id = $1",
                &[&id, &status.as_str(), &last_error],
            )
            .await?;
        Ok(())
    }

    pub async fn assign_groups(&self, tenant_id: i32, id: i32, group_ids: &[i32]) -> AppResult<Account> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE accounts SET assigned_group_ids = $3 WHERE id = $1 AND tenant_id = $2 RETURNING *",
                &[&id, &tenant_id, &serde_json::to_value(group_ids)?],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("account not found".into()))?;
        Ok(Self::row_to_account(&row))
    }

    pub async fn deactivate(&self, tenant_id: i32, id: i32) -> AppResult<Account> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE accounts SET status = 'inactive' WHERE id = $1 AND tenant_id = $2 RETURNING *",
                &[&id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("account not found".into()))?;
        Ok(Self::row_to_account(&row))
    }

    /// hard delete, unlike every other entity: an account's artifacts are
    /// removed from disk by the caller, so the row has nothing left to
    /// soft-delete for.
    pub async fn delete(&self, tenant_id: i32, id: i32) -> AppResult<()> {
        let client = self.pool.get().await?;
        let count = client
            .execute(
                "DELETE FROM accounts WHERE id = $1 AND tenant_id = $2",
                &[&id, &tenant_id],
            )
            .await?;
        if count == 0 {
            return Err(AppError::NotFound("account not found".into()));
        }
        Ok(())
    }
}
