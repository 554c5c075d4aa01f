use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::db::models::WatchUser;
use crate::error::{AppError, AppResult};
use crate::http::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// `GET /watchlist`
pub async fn list(State(state): State<AppState>, auth: AuthContext, Query(q): Query<ListQuery>) -> AppResult<Json<Vec<WatchUser>>> {
    let watch_users = if q.include_inactive {
        state.watchlist.list(auth.tenant_id).await?
    } else {
        state.watchlist.list_active(auth.tenant_id).await?
    };
    Ok(Json(watch_users))
}

/// validates `WatchUser.group_ids ⊆ tenant's active Groups` and
/// `WatchUser.forwarding_destination_ids ⊆ tenant's active Destinations`.
async fn validate_references(state: &AppState, tenant_id: i32, group_ids: &[i32], destination_ids: &[i32]) -> AppResult<()> {
    if !group_ids.is_empty() {
        let active_groups = state.groups.list(tenant_id).await?;
        let active_ids: Vec<i32> = active_groups.iter().filter(|g| g.is_active).map(|g| g.id).collect();
        for id in group_ids {
            if !active_ids.contains(id) {
                return Err(AppError::Validation(format!("group {id} is not an active group of this tenant")));
            }
        }
    }
    if !destination_ids.is_empty() {
        let active_destinations = state.destinations.list(tenant_id).await?;
        let active_ids: Vec<i32> = active_destinations.iter().filter(|d| d.is_active).map(|d| d.id).collect();
        for id in destination_ids {
            if !active_ids.contains(id) {
                return Err(AppError::Validation(format!(
                    "destination {id} is not an active destination of this tenant"
                )));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateWatchUserRequest {
    pub username: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub group_ids: Vec<i32>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub forwarding_destination_ids: Vec<i32>,
}

/// `POST /watchlist`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateWatchUserRequest>,
) -> AppResult<Json<WatchUser>> {
    auth.require_mutate()?;
    validate_references(&state, auth.tenant_id, &body.group_ids, &body.forwarding_destination_ids).await?;

    let keywords: Vec<String> = body.keywords.iter().map(|k| k.to_lowercase()).collect();
    let watch_user = state
        .watchlist
        .create(
            auth.tenant_id,
            &body.username,
            body.full_name.as_deref(),
            &body.group_ids,
            &keywords,
            &body.forwarding_destination_ids,
        )
        .await?;
    Ok(Json(watch_user))
}

/// `GET /watchlist/{id}`
pub async fn get(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<Json<WatchUser>> {
    Ok(Json(state.watchlist.get(auth.tenant_id, id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateWatchUserRequest {
    pub group_ids: Option<Vec<i32>>,
    pub keywords: Option<Vec<String>>,
    pub forwarding_destination_ids: Option<Vec<i32>>,
}

/// `PUT /watchlist/{id}`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(body): Json<UpdateWatchUserRequest>,
) -> AppResult<Json<WatchUser>> {
    auth.require_mutate()?;
    validate_references(
        &state,
        auth.tenant_id,
        body.group_ids.as_deref().unwrap_or(&[]),
        body.forwarding_destination_ids.as_deref().unwrap_or(&[]),
    )
    .await?;

    let keywords = body.keywords.map(|ks| ks.iter().map(|k| k.to_lowercase()).collect::<Vec<_>>());
    let watch_user = state
        .watchlist
        .update(
            auth.tenant_id,
            id,
            body.group_ids.as_deref(),
            keywords.as_deref(),
            body.forwarding_destination_ids.as_deref(),
        )
        .await?;
    Ok(Json(watch_user))
}

/// `DELETE /watchlist/{id}` — soft-delete.
pub async fn deactivate(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<Json<WatchUser>> {
    auth.require_mutate()?;
    Ok(Json(state.watchlist.deactivate(auth.tenant_id, id).await?))
}
