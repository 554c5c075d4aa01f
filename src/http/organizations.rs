use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::db::models::{Organization, Plan};
use crate::error::{AppError, AppResult};
use crate::http::AppState;

/// `GET /organizations/current`
pub async fn get_current(State(state): State<AppState>, auth: AuthContext) -> AppResult<Json<Organization>> {
    Ok(Json(state.organizations.get(auth.tenant_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub plan: Option<String>,
}

/// `PUT /organizations/current` — admin+; validates `plan` against the
/// closed set before touching the store.
pub async fn update_current(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<UpdateOrganizationRequest>,
) -> AppResult<Json<Organization>> {
    auth.require_mutate()?;

    if let Some(raw_plan) = &body.plan {
        let plan = Plan::parse(raw_plan).ok_or_else(|| AppError::Validation(format!("unknown plan '{raw_plan}'")))?;
        state.organizations.update_plan(auth.tenant_id, plan).await?;
    }

    if body.name.is_some() || body.description.is_some() {
        state
            .organizations
            .update_profile(auth.tenant_id, body.name.as_deref(), body.description.as_deref())
            .await?;
    }

    Ok(Json(state.organizations.get(auth.tenant_id).await?))
}
