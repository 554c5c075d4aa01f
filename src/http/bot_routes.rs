use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use teloxide::types::Update;

use crate::auth::AuthContext;
use crate::bot;
use crate::error::{AppError, AppResult};
use crate::http::AppState;

/// `POST /telegram/webhook/{secret}` — no bearer auth; the path segment
/// itself is the shared secret. A wrong secret is indistinguishable from a
/// missing route to the caller.
pub async fn webhook(State(state): State<AppState>, Path(secret): Path<String>, Json(update): Json<Update>) -> AppResult<()> {
    if secret != state.config.webhook_secret {
        return Err(AppError::Forbidden("unknown webhook secret".into()));
    }
    bot::process_update(&state.bot_deps, update).await;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct BotProbe {
    pub ok: bool,
    pub username: Option<String>,
}

/// `POST /test/bot` — confirms the configured bot token resolves to a live
/// bot, the webhook-path equivalent of `destinations::test` for the bot leg.
/// Viewer-permitted: a read-only probe, unlike `destinations::test` which
/// sends a live message to a tenant-configured chat.
pub async fn test_bot(State(state): State<AppState>, _auth: AuthContext) -> AppResult<Json<BotProbe>> {
    match state.bot_deps.bot.get_me().await {
        Ok(me) => Ok(Json(BotProbe {
            ok: true,
            username: me.username().map(|u| u.to_string()),
        })),
        Err(e) => {
            log::warn!("test_bot: get_me failed: {e}");
            Ok(Json(BotProbe { ok: false, username: None }))
        }
    }
}
