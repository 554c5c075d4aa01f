pub mod accounts;
pub mod auth;
pub mod bot_routes;
pub mod destinations;
pub mod forwarded_messages;
pub mod groups;
pub mod messages;
pub mod organizations;
pub mod stats;
pub mod users;
pub mod watchlist;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use deadpool_postgres::Pool;
use teloxide::Bot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

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
use crate::db::organizations::OrganizationRepo;
use crate::db::users::UserRepo;
use crate::db::watchlist::WatchlistRepo;
use crate::forwarding::ForwardingEngine;
use crate::supervisor::SupervisorHandle;

/// everything a request handler needs: the full set of tenant-scoped
/// repositories plus the long-lived actors handlers may have to signal.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: Pool,
    pub bot: Bot,
    pub organizations: OrganizationRepo,
    pub users: UserRepo,
    pub groups: GroupRepo,
    pub watchlist: WatchlistRepo,
    pub destinations: DestinationRepo,
    pub accounts: AccountRepo,
    pub messages: MessageRepo,
    pub forwarded_messages: ForwardedMessageRepo,
    pub bot_commands: BotCommandRepo,
    pub account_service: AccountService,
    pub analytics: AnalyticsAggregator,
    pub supervisor: SupervisorHandle,
    pub forwarding: Arc<ForwardingEngine>,
    pub bot_deps: BotDeps,
}

/// assembles the `/api` surface, plus the unprefixed webhook route (the
/// secret lives in the path, not under `/api`).
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/telegram", post(auth::telegram_login))
        .route("/auth/me", get(auth::me))
        .route("/auth/login", post(auth::deprecated_login))
        .route(
            "/organizations/current",
            get(organizations::get_current).put(organizations::update_current),
        )
        .route("/users", get(users::list))
        .route("/users/invite", post(users::invite))
        .route("/users/:id/role", put(users::update_role))
        .route("/users/:id", axum::routing::delete(users::deactivate))
        .route("/groups", get(groups::list).post(groups::create))
        .route(
            "/groups/:id",
            get(groups::get).put(groups::update).delete(groups::deactivate),
        )
        .route("/watchlist", get(watchlist::list).post(watchlist::create))
        .route(
            "/watchlist/:id",
            get(watchlist::get).put(watchlist::update).delete(watchlist::deactivate),
        )
        .route(
            "/forwarding-destinations",
            get(destinations::list).post(destinations::create),
        )
        .route(
            "/forwarding-destinations/:id",
            get(destinations::get).put(destinations::update).delete(destinations::deactivate),
        )
        .route("/forwarding-destinations/:id/test", post(destinations::test))
        .route("/messages", get(messages::list))
        .route("/messages/search", get(messages::search))
        .route("/accounts", get(accounts::list))
        .route("/accounts/upload", post(accounts::upload))
        .route("/accounts/:id/activate", post(accounts::activate))
        .route("/accounts/:id/deactivate", post(accounts::deactivate))
        .route("/accounts/:id", axum::routing::delete(accounts::delete))
        .route("/forwarded-messages", get(forwarded_messages::list))
        .route("/stats", get(stats::get_stats))
        .route("/test/bot", post(bot_routes::test_bot));

    Router::new()
        .nest("/api", api)
        .route("/telegram/webhook/:secret", post(bot_routes::webhook))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
