use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;

/// Abstract error taxonomy shared by every component. Each kind carries its
/// own HTTP mapping; the forwarder and supervisor never surface these as
/// HTTP, they only use the propagation rules.
#[derive(Debug)]
pub enum AppError {
    Unauthenticated(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Validation(String),
    Deprecated(String),
    UpstreamTransient(String),
    UpstreamPermanent(String),
    StoreUnavailable(String),
    ArtifactInvalid(String),
    RateLimited(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthenticated(m) => write!(f, "unauthenticated: {m}"),
            AppError::Forbidden(m) => write!(f, "forbidden: {m}"),
            AppError::NotFound(m) => write!(f, "not found: {m}"),
            AppError::Conflict(m) => write!(f, "conflict: {m}"),
            AppError::Validation(m) => write!(f, "validation: {m}"),
            AppError::Deprecated(m) => write!(f, "deprecated: {m}"),
            AppError::UpstreamTransient(m) => write!(f, "upstream transient: {m}"),
            AppError::UpstreamPermanent(m) => write!(f, "upstream permanent: {m}"),
            AppError::StoreUnavailable(m) => write!(f, "store unavailable: {m}"),
            AppError::ArtifactInvalid(m) => write!(f, "artifact invalid: {m}"),
            AppError::RateLimited(m) => write!(f, "rate limited: {m}"),
            AppError::Internal(m) => write!(f, "internal: {m}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            AppError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::Deprecated(_) => (StatusCode::GONE, "deprecated"),
            AppError::UpstreamTransient(_) => (StatusCode::BAD_GATEWAY, "upstream_transient"),
            AppError::UpstreamPermanent(_) => (StatusCode::BAD_GATEWAY, "upstream_permanent"),
            AppError::StoreUnavailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            AppError::ArtifactInvalid(_) => (StatusCode::UNPROCESSABLE_ENTITY, "artifact_invalid"),
            AppError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        // StoreUnavailable on a write path must never leak storage details to
        // the caller; it is reported as a generic Internal failure.
        let message = match &self {
            AppError::StoreUnavailable(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        (
            status,
            Json(ErrorBody {
                error: kind.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
