use axum::extract::{Multipart, Path, State};
use axum::Json;

use crate::auth::AuthContext;
use crate::db::models::Account;
use crate::error::{AppError, AppResult};
use crate::http::AppState;

/// `GET /accounts`
pub async fn list(State(state): State<AppState>, auth: AuthContext) -> AppResult<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list(auth.tenant_id).await?))
}

struct UploadFields {
    name: Option<String>,
    session_filename: Option<String>,
    session_bytes: Option<Vec<u8>>,
    json_filename: Option<String>,
    json_bytes: Option<Vec<u8>>,
}

/// `POST /accounts/upload` — multipart with exactly one `.session` and one
/// `.json` field; an optional `name` field labels the account.
pub async fn upload(State(state): State<AppState>, auth: AuthContext, mut multipart: Multipart) -> AppResult<Json<Account>> {
    auth.require_mutate()?;

    let mut fields = UploadFields {
        name: None,
        session_filename: None,
        session_bytes: None,
        json_filename: None,
        json_bytes: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "name" => {
                fields.name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("invalid name field: {e}")))?,
                );
            }
            "session" => {
                fields.session_filename = field.file_name().map(|s| s.to_string());
                fields.session_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("invalid session field: {e}")))?
                        .to_vec(),
                );
            }
            "json" => {
                fields.json_filename = field.file_name().map(|s| s.to_string());
                fields.json_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("invalid json field: {e}")))?
                        .to_vec(),
                );
            }
            other => {
                return Err(AppError::Validation(format!("unexpected multipart field '{other}'")));
            }
        }
    }

    let session_filename = fields
        .session_filename
        .ok_or_else(|| AppError::Validation("missing .session file".into()))?;
    let session_bytes = fields.session_bytes.ok_or_else(|| AppError::Validation("missing .session file".into()))?;
    let json_filename = fields.json_filename.ok_or_else(|| AppError::Validation("missing .json file".into()))?;
    let json_bytes = fields.json_bytes.ok_or_else(|| AppError::Validation("missing .json file".into()))?;
    let name = fields.name.unwrap_or_else(|| session_filename.clone());

    let account = state
        .account_service
        .upload(auth.tenant_id, &name, &session_filename, &session_bytes, &json_filename, &json_bytes)
        .await?;
    Ok(Json(account))
}

/// `POST /accounts/{id}/activate`
pub async fn activate(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<Json<Account>> {
    auth.require_mutate()?;
    let account = state.account_service.activate(auth.tenant_id, id, &state.supervisor).await?;
    state.supervisor.rebalance(auth.tenant_id).await;
    Ok(Json(account))
}

/// `POST /accounts/{id}/deactivate`
pub async fn deactivate(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<Json<Account>> {
    auth.require_mutate()?;
    let account = state.account_service.deactivate(auth.tenant_id, id, &state.supervisor).await?;
    state.supervisor.rebalance(auth.tenant_id).await;
    Ok(Json(account))
}

/// `DELETE /accounts/{id}` — removes both artifacts and the record.
pub async fn delete(State(state): State<AppState>, auth: AuthContext, Path(id): Path<i32>) -> AppResult<()> {
    auth.require_mutate()?;
    state.account_service.delete(auth.tenant_id, id, &state.supervisor).await?;
    state.supervisor.rebalance(auth.tenant_id).await;
    Ok(())
}
