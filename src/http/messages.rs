use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::db::models::{MessageLog, MessageType};
use crate::error::{AppError, AppResult};
use crate::http::AppState;

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub group_id: Option<i32>,
    pub message_type: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: i64,
}

/// `GET /messages` — filters `group_id?`, `message_type?`, `limit`, `skip`.
pub async fn list(State(state): State<AppState>, auth: AuthContext, Query(q): Query<ListQuery>) -> AppResult<Json<Vec<MessageLog>>> {
    let message_type = q
        .message_type
        .as_deref()
        .map(|raw| MessageType::parse(raw).ok_or_else(|| AppError::Validation(format!("unknown message_type '{raw}'"))))
        .transpose()?;

    let messages = state
        .messages
        .list(auth.tenant_id, None, q.group_id, message_type, q.limit, q.skip)
        .await?;
    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: i64,
}

/// `GET /messages/search` — substring scan over text/username/group_name.
pub async fn search(State(state): State<AppState>, auth: AuthContext, Query(q): Query<SearchQuery>) -> AppResult<Json<Vec<MessageLog>>> {
    if q.q.trim().is_empty() {
        return Err(AppError::Validation("q must not be empty".into()));
    }
    let messages = state.messages.search(auth.tenant_id, &q.q, q.limit, q.skip).await?;
    Ok(Json(messages))
}
