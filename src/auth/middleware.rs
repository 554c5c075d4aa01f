use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::token;
use crate::auth::AuthContext;
use crate::error::{AppError, ErrorBody};
use crate::http::AppState;

fn auth_error(err: AppError) -> Response {
    let status = match &err {
        AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        axum::Json(ErrorBody {
            error: "unauthenticated".into(),
            message: err.to_string(),
        }),
    )
        .into_response()
}

/// axum extractor resolving the bearer token of every tenant-scoped handler
/// into an `AuthContext`, the same `FromRequestParts` shape the pack's
/// security middleware uses for its link-token extractor.
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| auth_error(AppError::Unauthenticated("missing bearer token".into())))?;

        let raw_token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| auth_error(AppError::Unauthenticated("malformed authorization header".into())))?;

        token::verify(state.config.token_signing_key.as_bytes(), raw_token).map_err(auth_error)
    }
}
