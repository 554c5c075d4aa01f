use deadpool_postgres::Pool;

use crate::db::models::{Role, User};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct UserRepo {
    pool: Pool,
}

impl UserRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &tokio_postgres::Row) -> User {
        let role_str: String = row.get("role");
        User {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            telegram_id: row.get("telegram_id"),
            username: row.get("username"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            photo_url: row.get("photo_url"),
            role: Role::parse(&role_str).unwrap_or(Role::Viewer),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            last_login: row.get("last_login"),
        }
    }

    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> AppResult<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM users WHERE telegram_id = $1",
                &[&telegram_id],
            )
            .await?;
        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    pub async fn get(&self, tenant_id: i32, user_id: i32) -> AppResult<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM users WHERE id = $1 AND tenant_id = $2",
                &[&user_id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        Ok(Self::row_to_user(&row))
    }

    pub async fn list(&self, tenant_id: i32) -> AppResult<Vec<User>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM users WHERE tenant_id = $1 ORDER BY id",
                &[&tenant_id],
            )
            .await?;
        Ok(rows.iter().map(Self::row_to_user).collect())
    }

    /// creates the first user of a newly registered tenant with role=owner
    pub async fn create_owner(
        &self,
        tenant_id: i32,
        telegram_id: i64,
        username: Option<&str>,
        first_name: &str,
        last_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> AppResult<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO users (tenant_id, telegram_id, username, first_name, last_name, photo_url, role)
                 VALUES ($1, $2, $3, $4, $5, $6, 'owner') RETURNING *",
                &[&tenant_id, &telegram_id, &username, &first_name, &last_name, &photo_url],
            )
            .await?;
        Ok(Self::row_to_user(&row))
    }

    pub async fn invite(
        &self,
        tenant_id: i32,
        telegram_id: i64,
        username: Option<&str>,
        first_name: &str,
        last_name: Option<&str>,
        role: Role,
    ) -> AppResult<User> {
        if role == Role::Owner {
            return Err(AppError::Validation(
                "cannot invite a second owner".into(),
            ));
        }
        let client = self.pool.get().await?;
        let existing = client
            .query_opt(
                "SELECT id FROM users WHERE telegram_id = $1",
                &[&telegram_id],
            )
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "telegram_id already registered".into(),
            ));
        }
        let row = client
            .query_one(
                "INSERT INTO users (tenant_id, telegram_id, username, first_name, last_name, role)
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
                &[&tenant_id, &telegram_id, &username, &first_name, &last_name, &role.as_str()],
            )
            .await?;
        Ok(Self::row_to_user(&row))
    }

    pub async fn update_role(&self, tenant_id: i32, user_id: i32, role: Role) -> AppResult<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE users SET role = $3 WHERE id = $1 AND tenant_id = $2 RETURNING *",
                &[&user_id, &tenant_id, &role.as_str()],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        Ok(Self::row_to_user(&row))
    }

    pub async fn deactivate(&self, tenant_id: i32, user_id: i32) -> AppResult<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE users SET is_active = FALSE WHERE id = $1 AND tenant_id = $2 RETURNING *",
                &[&user_id, &tenant_id],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        Ok(Self::row_to_user(&row))
    }

    pub async fn update_login(
        &self,
        user_id: i32,
        photo_url: Option<&str>,
    ) -> AppResult<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE users SET photo_url = COALESCE($2, photo_url), last_login = NOW()
                 WHERE id = $1 RETURNING *",
                &[&user_id, &photo_url],
            )
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        Ok(Self::row_to_user(&row))
    }
}
