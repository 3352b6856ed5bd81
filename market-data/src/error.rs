use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Service error surfaced by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("upstream source failure: {0}")]
    Upstream(String),
    #[error(transparent)]
    Db(#[from] diesel::result::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn pool(e: impl std::fmt::Display) -> Self {
        ApiError::Internal(anyhow::anyhow!("connection pool error: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Db(e) => {
                error!(error = ?e, "Database error in handler");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            },
            ApiError::Internal(e) => {
                error!(error = ?e, "Unexpected error in handler");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            },
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
