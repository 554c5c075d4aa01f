pub mod accounts;
pub mod analytics;
pub mod auth;
pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod forwarding;
pub mod http;
pub mod pipeline;
pub mod supervisor;

use std::sync::Arc;

use log::info;
use teloxide::Bot;
use tokio::signal;
use tokio::sync::watch;

use crate::accounts::artifact_store::ArtifactStore;
use crate::accounts::AccountService;
use crate::analytics::AnalyticsAggregator;
use crate::bot::BotDeps;
use crate::config::Config;
use crate::db::accounts::AccountRepo;
use crate::db::bot_commands::BotCommandRepo;
use crate::db::destinations::DestinationRepo;
use crate::db::forwarded_messages::ForwardedMessageRepo;
use crate::db::groups::GroupRepo;
use crate::db::messages::MessageRepo;
use crate::db::migrations::MigrationManager;
use crate::db::organizations::OrganizationRepo;
use crate::db::users::UserRepo;
use crate::db::watchlist::WatchlistRepo;
use crate::forwarding::{DestinationRateLimiter, ForwardingEngine, RateLimit, TeloxideDeliverer};
use crate::http::AppState;
use crate::pipeline::PipelineEngine;
use crate::supervisor::health_monitor::HeartbeatRegistry;
use crate::supervisor::SupervisorHandle;

/// assembles every repository, actor and the axum router, then serves until
/// a shutdown signal arrives.
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    if let Err(e) = dotenvy::dotenv() {
        match e {
            dotenvy::Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            _ => eprintln!("warning: failed to load .env file: {e}"),
        }
    }

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = Config::from_env()?;

    info!("Initializing database...");
    let pool = db::create_pool(&config.database_url).await?;
    MigrationManager::run_migrations(&pool).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let organizations = OrganizationRepo::new(pool.clone());
    let users = UserRepo::new(pool.clone());
    let groups = GroupRepo::new(pool.clone());
    let watchlist = WatchlistRepo::new(pool.clone());
    let destinations = DestinationRepo::new(pool.clone());
    let accounts = AccountRepo::new(pool.clone());
    let messages = MessageRepo::new(pool.clone());
    let forwarded_messages = ForwardedMessageRepo::new(pool.clone());
    let bot_commands = BotCommandRepo::new(pool.clone());
    let analytics = AnalyticsAggregator::new(pool.clone());

    let artifact_store = ArtifactStore::new(config.artifact_root.clone());
    let account_service = AccountService::new(accounts.clone(), artifact_store);

    let bot = Bot::new(config.bot_token.clone());

    let pipeline = PipelineEngine::new(watchlist.clone(), messages.clone(), groups.clone(), destinations.clone());

    let rate_limiter = DestinationRateLimiter::new(RateLimit {
        per_minute: config.default_destination_rate_limit,
        burst: config.default_destination_burst,
    });
    let deliverer = Arc::new(TeloxideDeliverer { bot: bot.clone() });
    let forwarding = Arc::new(ForwardingEngine::new(
        destinations.clone(),
        forwarded_messages.clone(),
        rate_limiter,
        deliverer,
        shutdown_rx.clone(),
    ));

    let heartbeats: HeartbeatRegistry = Default::default();
    let supervisor = SupervisorHandle::new(
        accounts.clone(),
        groups.clone(),
        pipeline,
        forwarding.clone(),
        heartbeats.clone(),
        config.tg_api_id,
        config.tg_api_hash.clone(),
        shutdown_rx.clone(),
    );

    info!("Bootstrapping active session accounts...");
    supervisor.bootstrap().await;

    let health_monitor_handle = tokio::spawn(crate::supervisor::health_monitor::run(
        heartbeats,
        accounts.clone(),
        supervisor.clone(),
        std::time::Duration::from_secs(config.health_check_interval_secs),
        shutdown_rx.clone(),
    ));

    let bot_deps = BotDeps {
        bot: bot.clone(),
        users: users.clone(),
        groups: groups.clone(),
        watchlist: watchlist.clone(),
        destinations: destinations.clone(),
        messages: messages.clone(),
        bot_commands: bot_commands.clone(),
        analytics: analytics.clone(),
    };

    let state = AppState {
        config: config.clone(),
        pool: pool.clone(),
        bot,
        organizations,
        users,
        groups,
        watchlist,
        destinations,
        accounts,
        messages,
        forwarded_messages,
        bot_commands,
        account_service,
        analytics,
        supervisor,
        forwarding,
        bot_deps,
    };

    let app = http::router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    health_monitor_handle.abort();
    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, draining in-flight work");
    let _ = shutdown_tx.send(true);
}
