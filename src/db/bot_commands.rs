use deadpool_postgres::Pool;

use crate::db::models::BotCommand;
use crate::error::AppResult;

#[derive(Clone)]
pub struct BotCommandRepo {
    pool: Pool,
}

impl BotCommandRepo {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_command(row: &tokio_postgres::Row) -> BotCommand {
        BotCommand {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            telegram_user_id: row.get("telegram_user_id"),
            command: row.get("command"),
            args: row.get("args"),
            timestamp: row.get("timestamp"),
        }
    }

    pub async fn record(
        &self,
        tenant_id: Option<i32>,
        telegram_user_id: i64,
        command: &str,
        args: &str,
    ) -> AppResult<BotCommand> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO bot_commands (tenant_id, telegram_user_id, command, args)
                 VALUES ($1, $2, $3, $4) RETURNING *",
                &[&tenant_id, &telegram_user_id, &command, &args],
            )
            .await?;
        Ok(Self::row_to_command(&row))
    }
}
