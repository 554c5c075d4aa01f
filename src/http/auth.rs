use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{telegram_login, token, AuthContext, TelegramLoginPayload};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::http::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
    pub organization_name: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: User,
}

/// `POST /auth/register` — atomic creation of an `Organization` plus its
/// first `owner` user, idempotent by `telegram_id`.
pub async fn register(State(state): State<AppState>, Json(body): Json<RegisterRequest>) -> AppResult<Json<TokenResponse>> {
    let payload = TelegramLoginPayload {
        id: body.id,
        first_name: body.first_name.clone(),
        last_name: body.last_name.clone(),
        username: body.username.clone(),
        photo_url: body.photo_url.clone(),
        auth_date: body.auth_date,
        hash: body.hash,
    };
    telegram_login::verify(&state.config.bot_token, &payload)?;

    if state.users.find_by_telegram_id(body.id).await?.is_some() {
        return Err(AppError::Conflict("telegram_id already registered".into()));
    }

    let organization = state.organizations.create(&body.organization_name).await?;
    let user = state
        .users
        .create_owner(
            organization.id,
            body.id,
            body.username.as_deref(),
            &body.first_name,
            body.last_name.as_deref(),
            body.photo_url.as_deref(),
        )
        .await?;

    let token = token::issue(state.config.token_signing_key.as_bytes(), &user, state.config.token_lifetime_secs)?;
    Ok(Json(TokenResponse { token, user }))
}

/// `POST /auth/telegram` — login for an already-registered user.
pub async fn telegram_login(
    State(state): State<AppState>,
    Json(payload): Json<TelegramLoginPayload>,
) -> AppResult<Json<TokenResponse>> {
    telegram_login::verify(&state.config.bot_token, &payload)?;

    let user = state
        .users
        .find_by_telegram_id(payload.id)
        .await?
        .ok_or_else(|| AppError::NotFound("no account registered for this telegram_id".into()))?;

    let user = state.users.update_login(user.id, payload.photo_url.as_deref()).await?;
    let token = token::issue(state.config.token_signing_key.as_bytes(), &user, state.config.token_lifetime_secs)?;
    Ok(Json(TokenResponse { token, user }))
}

/// `GET /auth/me`
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> AppResult<Json<User>> {
    let user = state.users.get(auth.tenant_id, auth.user_id).await?;
    Ok(Json(user))
}

/// `POST /auth/login` — legacy email/password endpoint, permanently gone.
pub async fn deprecated_login() -> AppError {
    AppError::Deprecated("email/password login was retired; use /auth/telegram".into())
}
