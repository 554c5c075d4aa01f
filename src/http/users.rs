use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::db::models::{Role, User};
use crate::error::{AppError, AppResult};
use crate::http::AppState;

/// `GET /users`
pub async fn list(State(state): State<AppState>, auth: AuthContext) -> AppResult<Json<Vec<User>>> {
    auth.require_mutate()?;
    Ok(Json(state.users.list(auth.tenant_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InviteRequest {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub role: String,
}

/// `POST /users/invite` — admin+; never creates a second `owner`.
pub async fn invite(State(state): State<AppState>, auth: AuthContext, Json(body): Json<InviteRequest>) -> AppResult<Json<User>> {
    auth.require_mutate()?;
    let role = Role::parse(&body.role).ok_or_else(|| AppError::Validation(format!("unknown role '{}'", body.role)))?;

    let user = state
        .users
        .invite(
            auth.tenant_id,
            body.telegram_id,
            body.username.as_deref(),
            &body.first_name,
            body.last_name.as_deref(),
            role,
        )
        .await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// `PUT /users/{id}/role` — owner-only role transitions.
pub async fn update_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(body): Json<UpdateRoleRequest>,
) -> AppResult<Json<User>> {
    auth.require_owner()?;
    let role = Role::parse(&body.role).ok_or_else(|| AppError::Validation(format!("unknown role '{}'", body.role)))?;
    Ok(Json(state.users.update_role(auth.tenant_id, id, role).await?))
}

/// `DELETE /users/{id}` — admin+; deactivates rather than deletes, so
/// audit trails (`bot_commands`) referencing this user stay readable.
pub async fn deactivate(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<Json<User>> {
    auth.require_mutate()?;
    Ok(Json(state.users.deactivate(auth.tenant_id, id).await?))
}
