pub mod accounts;
pub mod bot_commands;
pub mod destinations;
pub mod forwarded_messages;
pub mod groups;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod organizations;
pub mod users;
pub mod watchlist;

use deadpool_postgres::{Config, Pool, Runtime};
use log::info;
use tokio_postgres_rustls::MakeRustlsConnect;

/// Creates the shared connection pool and runs migrations, mirroring the
/// teacher's `CacheManager::new` / `MigrationManager::run_migrations` split,
/// generalized to this service's schema.
pub async fn create_pool(database_url: &str) -> Result<Pool, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = Config::new();
    config.url = Some(database_url.to_string());

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls = MakeRustlsConnect::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    );

    let pool = config.create_pool(Some(Runtime::Tokio1), tls)?;
    info!("Database pool created");
    Ok(pool)
}

/// Helper shared by every repository: fetch a vec column stored as a JSONB
/// array of plain scalars. Repositories store id sets (`group_ids`,
/// `forwarding_destination_ids`, `assigned_group_ids`) and string sets
/// (`keywords`) this way rather than normalized join tables, matching the
/// teacher's preference for JSONB columns over extra tables
/// (`channel_messages.messages_data`, `llm_results.analysis_result`).
pub fn json_to_vec<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Vec<T> {
    serde_json::from_value(value).unwrap_or_default()
}
