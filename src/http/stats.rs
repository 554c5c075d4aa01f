use axum::extract::State;
use axum::Json;

use crate::analytics::Stats;
use crate::auth::AuthContext;
use crate::error::AppResult;
use crate::http::AppState;

/// `GET /stats` — on-demand rollups, strictly tenant-scoped.
pub async fn get_stats(State(state): State<AppState>, auth: AuthContext) -> AppResult<Json<Stats>> {
    Ok(Json(state.analytics.compute(auth.tenant_id).await?))
}
