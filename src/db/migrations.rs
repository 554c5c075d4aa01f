use deadpool_postgres::Pool;
use log::info;
use tokio_postgres::Transaction;

pub struct MigrationManager;

impl MigrationManager {
    pub async fn run_migrations(
        pool: &Pool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Running database migrations...");
        let mut client = pool.get().await?;

        let needs_init = client
            .query_opt(
                "SELECT 1 FROM pg_tables WHERE schemaname = 'public' AND tablename = 'schema_migrations'",
                &[],
            )
            .await?
            .is_none();

        if needs_init {
            let transaction = client.transaction().await?;
            Self::initial_setup(&transaction).await?;
            transaction.commit().await?;
            info!("Initial database setup completed");
        }

        let current_version = Self::get_current_version(&mut client).await?;
        if current_version < Self::latest_version() {
            let transaction = client.transaction().await?;
            Self::run_pending_migrations(&transaction, current_version).await?;
            transaction.commit().await?;
            info!("Database migrations completed");
        } else {
            info!("Database schema is up to date");
        }

        Ok(())
    }

    async fn initial_setup(
        transaction: &Transaction<'_>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let migration_sql = r#"
            CREATE TABLE schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            );

            CREATE TABLE organizations (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                plan VARCHAR(20) NOT NULL DEFAULT 'free' CHECK (plan IN ('free', 'pro', 'enterprise')),
                usage_stats JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            );

            CREATE TABLE users (
                id SERIAL PRIMARY KEY,
                tenant_id INTEGER NOT NULL REFERENCES organizations(id),
                telegram_id BIGINT NOT NULL UNIQUE,
                username VARCHAR(255),
                first_name VARCHAR(255) NOT NULL,
                last_name VARCHAR(255),
                photo_url TEXT,
                role VARCHAR(20) NOT NULL DEFAULT 'viewer' CHECK (role IN ('owner', 'admin', 'viewer')),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                last_login TIMESTAMP WITH TIME ZONE
            );

            CREATE TABLE groups (
                id SERIAL PRIMARY KEY,
                tenant_id INTEGER NOT NULL REFERENCES organizations(id),
                group_id VARCHAR(64) NOT NULL,
                group_name VARCHAR(255) NOT NULL,
                group_type VARCHAR(20) NOT NULL CHECK (group_type IN ('group', 'supergroup', 'channel')),
                invite_link TEXT,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                UNIQUE (tenant_id, group_id)
            );

            CREATE TABLE watch_users (
                id SERIAL PRIMARY KEY,
                tenant_id INTEGER NOT NULL REFERENCES organizations(id),
                username VARCHAR(255) NOT NULL,
                user_id BIGINT,
                full_name VARCHAR(255),
                group_ids JSONB NOT NULL DEFAULT '[]'::jsonb,
                keywords JSONB NOT NULL DEFAULT '[]'::jsonb,
                forwarding_destination_ids JSONB NOT NULL DEFAULT '[]'::jsonb,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                UNIQUE (tenant_id, username)
            );

            CREATE TABLE destinations (
                id SERIAL PRIMARY KEY,
                tenant_id INTEGER NOT NULL REFERENCES organizations(id),
                destination_id VARCHAR(64) NOT NULL,
                destination_name VARCHAR(255) NOT NULL,
                destination_type VARCHAR(20) NOT NULL CHECK (destination_type IN ('channel', 'group', 'user')),
                description TEXT,
                message_count BIGINT NOT NULL DEFAULT 0,
                last_forwarded TIMESTAMP WITH TIME ZONE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                UNIQUE (tenant_id, destination_id)
            );

            CREATE TABLE accounts (
                id SERIAL PRIMARY KEY,
                tenant_id INTEGER NOT NULL REFERENCES organizations(id),
                name VARCHAR(255) NOT NULL,
                session_artifact_path TEXT NOT NULL,
                metadata_artifact_path TEXT NOT NULL,
                phone_number VARCHAR(32),
                username VARCHAR(255),
                first_name VARCHAR(255),
                last_name VARCHAR(255),
                status VARCHAR(20) NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'active', 'inactive', 'error')),
                last_error TEXT,
                assigned_group_ids JSONB NOT NULL DEFAULT '[]'::jsonb,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                last_activity TIMESTAMP WITH TIME ZONE
            );

            CREATE TABLE message_logs (
                id SERIAL PRIMARY KEY,
                tenant_id INTEGER NOT NULL REFERENCES organizations(id),
                group_id INTEGER NOT NULL REFERENCES groups(id),
                group_name VARCHAR(255) NOT NULL,
                user_id BIGINT,
                username VARCHAR(255),
                message_id BIGINT NOT NULL,
                message_text TEXT,
                message_type VARCHAR(20) NOT NULL CHECK (message_type IN ('text', 'photo', 'video', 'document', 'audio', 'voice', 'sticker', 'other')),
                media_info JSONB NOT NULL DEFAULT '{}'::jsonb,
                matched_keywords JSONB NOT NULL DEFAULT '[]'::jsonb,
                timestamp TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                ingested_via VARCHAR(20) NOT NULL CHECK (ingested_via IN ('session', 'webhook')),
                UNIQUE (tenant_id, group_id, message_id)
            );

            CREATE TABLE forwarded_messages (
                id SERIAL PRIMARY KEY,
                tenant_id INTEGER NOT NULL REFERENCES organizations(id),
                source_message_ref INTEGER NOT NULL REFERENCES message_logs(id),
                username VARCHAR(255),
                group_name VARCHAR(255) NOT NULL,
                destination_id INTEGER NOT NULL REFERENCES destinations(id),
                forwarded_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                outcome VARCHAR(20) NOT NULL CHECK (outcome IN ('delivered', 'failed')),
                failure_reason TEXT
            );

            CREATE TABLE bot_commands (
                id SERIAL PRIMARY KEY,
                tenant_id INTEGER REFERENCES organizations(id),
                telegram_user_id BIGINT NOT NULL,
                command VARCHAR(64) NOT NULL,
                args TEXT NOT NULL DEFAULT '',
                timestamp TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            );

            CREATE INDEX idx_users_tenant ON users(tenant_id);
            CREATE INDEX idx_groups_tenant ON groups(tenant_id);
            CREATE INDEX idx_watch_users_tenant ON watch_users(tenant_id);
            CREATE INDEX idx_destinations_tenant ON destinations(tenant_id);
            CREATE INDEX idx_accounts_tenant ON accounts(tenant_id);
            CREATE INDEX idx_message_logs_tenant ON message_logs(tenant_id);
            CREATE INDEX idx_message_logs_timestamp ON message_logs(timestamp);
            CREATE INDEX idx_message_logs_username ON message_logs(username);
            CREATE INDEX idx_forwarded_messages_tenant ON forwarded_messages(tenant_id);
            CREATE INDEX idx_forwarded_messages_destination ON forwarded_messages(destination_id);
            CREATE INDEX idx_bot_commands_tenant ON bot_commands(tenant_id);

            INSERT INTO schema_migrations (version) VALUES (1);
        "#;

        transaction.batch_execute(migration_sql).await?;
        Ok(())
    }

    async fn get_current_version(
        client: &deadpool_postgres::Object,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let row = client
            .query_one("SELECT MAX(version) FROM schema_migrations", &[])
            .await?;
        Ok(row.get::<_, Option<i32>>(0).unwrap_or(0))
    }

    fn latest_version() -> i32 {
        1 // increment this when adding new migrations
    }

    async fn run_pending_migrations(
        _transaction: &Transaction<'_>,
        _current_version: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
