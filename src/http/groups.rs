use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::db::models::{Group, GroupType};
use crate::error::{AppError, AppResult};
use crate::http::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// `GET /groups`
pub async fn list(State(state): State<AppState>, auth: AuthContext, Query(q): Query<ListQuery>) -> AppResult<Json<Vec<Group>>> {
    let groups = state.groups.list(auth.tenant_id).await?;
    let groups = if q.include_inactive {
        groups
    } else {
        groups.into_iter().filter(|g| g.is_active).collect()
    };
    Ok(Json(groups))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub group_id: String,
    pub group_name: String,
    pub group_type: String,
    pub invite_link: Option<String>,
    pub description: Option<String>,
}

/// `POST /groups` — admin+; a new group widens the tenant's monitored set,
/// so the load balancer is asked to recompute assignments.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateGroupRequest>,
) -> AppResult<Json<Group>> {
    auth.require_mutate()?;
    let group_type = GroupType::parse(&body.group_type)
        .ok_or_else(|| AppError::Validation(format!("unknown group_type '{}'", body.group_type)))?;

    let group = state
        .groups
        .create(
            auth.tenant_id,
            &body.group_id,
            &body.group_name,
            group_type,
            body.invite_link.as_deref(),
            body.description.as_deref(),
        )
        .await?;

    state.supervisor.rebalance(auth.tenant_id).await;
    Ok(Json(group))
}

/// `GET /groups/{id}`
pub async fn get(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<Json<Group>> {
    Ok(Json(state.groups.get(auth.tenant_id, id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGroupRequest {
    pub group_name: Option<String>,
    pub description: Option<String>,
}

/// `PUT /groups/{id}`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(body): Json<UpdateGroupRequest>,
) -> AppResult<Json<Group>> {
    auth.require_mutate()?;
    Ok(Json(
        state
            .groups
            .update(auth.tenant_id, id, body.group_name.as_deref(), body.description.as_deref())
            .await?,
    ))
}

/// `DELETE /groups/{id}` — soft-delete; the group leaves the monitored set
/// so assignments are recomputed.
pub async fn deactivate(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<Json<Group>> {
    auth.require_mutate()?;
    let group = state.groups.deactivate(auth.tenant_id, id).await?;
    state.supervisor.rebalance(auth.tenant_id).await;
    Ok(Json(group))
}
