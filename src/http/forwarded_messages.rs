use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::db::models::ForwardedMessage;
use crate::error::AppResult;
use crate::http::AppState;

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub username: Option<String>,
    pub destination_id: Option<i32>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: i64,
}

/// `GET /forwarded-messages` — filter `username?`, `destination_id?`.
pub async fn list(State(state): State<AppState>, auth: AuthContext, Query(q): Query<ListQuery>) -> AppResult<Json<Vec<ForwardedMessage>>> {
    let messages = state
        .forwarded_messages
        .list(auth.tenant_id, q.username.as_deref(), q.destination_id, q.limit, q.skip)
        .await?;
    Ok(Json(messages))
}
