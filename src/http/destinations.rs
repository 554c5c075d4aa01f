use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::auth::AuthContext;
use crate::db::models::{Destination, DestinationType};
use crate::error::{AppError, AppResult};
use crate::http::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// `GET /forwarding-destinations`
pub async fn list(State(state): State<AppState>, auth: AuthContext, Query(q): Query<ListQuery>) -> AppResult<Json<Vec<Destination>>> {
    let destinations = state.destinations.list(auth.tenant_id).await?;
    let destinations = if q.include_inactive {
        destinations
    } else {
        destinations.into_iter().filter(|d| d.is_active).collect()
    };
    Ok(Json(destinations))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDestinationRequest {
    pub destination_id: String,
    pub destination_name: String,
    pub destination_type: String,
    pub description: Option<String>,
}

/// `POST /forwarding-destinations`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateDestinationRequest>,
) -> AppResult<Json<Destination>> {
    auth.require_mutate()?;
    let destination_type = DestinationType::parse(&body.destination_type)
        .ok_or_else(|| AppError::Validation(format!("unknown destination_type '{}'", body.destination_type)))?;

    let destination = state
        .destinations
        .create(
            auth.tenant_id,
            &body.destination_id,
            &body.destination_name,
            destination_type,
            body.description.as_deref(),
        )
        .await?;
    Ok(Json(destination))
}

/// `GET /forwarding-destinations/{id}`
pub async fn get(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<Json<Destination>> {
    Ok(Json(state.destinations.get(auth.tenant_id, id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateDestinationRequest {
    pub destination_name: Option<String>,
    pub description: Option<String>,
}

/// `PUT /forwarding-destinations/{id}` — renaming or re-describing a
/// destination never touches `destination_id`/`destination_type`, which are
/// the identity the forwarding engine keys its queue on.
pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(body): Json<UpdateDestinationRequest>,
) -> AppResult<Json<Destination>> {
    auth.require_mutate()?;
    Ok(Json(
        state
            .destinations
            .update(auth.tenant_id, id, body.destination_name.as_deref(), body.description.as_deref())
            .await?,
    ))
}

/// `DELETE /forwarding-destinations/{id}` — soft-delete; a destination
/// still `is_active=false` at forward-emit time records a `failed` ledger
/// row rather than suppressing it (resolved Open Question, DESIGN.md).
pub async fn deactivate(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<Json<Destination>> {
    auth.require_mutate()?;
    Ok(Json(state.destinations.deactivate(auth.tenant_id, id).await?))
}

#[derive(Debug, Serialize)]
pub struct TestResult {
    pub ok: bool,
    pub detail: String,
}

/// `POST /forwarding-destinations/{id}/test` — sends a probe message via
/// the Bot API directly (bypassing the queue/ledger, since a probe is not
/// an archived forward).
pub async fn test(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<Json<TestResult>> {
    auth.require_mutate()?;
    let destination = state.destinations.get(auth.tenant_id, id).await?;

    let chat_id: i64 = destination
        .destination_id
        .parse()
        .map_err(|_| AppError::Validation("destination chat id is not numeric".into()))?;

    match state
        .bot
        .send_message(ChatId(chat_id), "Test message from the monitoring service.")
        .parse_mode(ParseMode::Html)
        .await
    {
        Ok(_) => Ok(Json(TestResult {
            ok: true,
            detail: "probe delivered".into(),
        })),
        Err(e) => Err(AppError::UpstreamPermanent(e.to_string())),
    }
}
