use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Typed service error. Handlers return this directly; the `IntoResponse`
/// impl is the single place where errors map to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("Balance after row {index} does not match: {provided} != {computed}")]
    BalanceMismatch {
        index: usize,
        provided: String,
        computed: String,
    },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Upstream(String),
    #[error(transparent)]
    Db(#[from] diesel::result::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WalletError {
    pub fn pool(e: impl std::fmt::Display) -> Self {
        WalletError::Internal(anyhow::anyhow!("connection pool error: {e}"))
    }
}

impl From<crate::position::PositionError> for WalletError {
    fn from(e: crate::position::PositionError) -> Self {
        WalletError::Validation(e.to_string())
    }
}

impl IntoResponse for WalletError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            WalletError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            WalletError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            WalletError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            WalletError::BalanceMismatch { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            },
            WalletError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            // The aggregator could not fulfil its contract against the
            // market-data service.
            WalletError::Upstream(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            WalletError::Db(e) => {
                error!(error = ?e, "Database error in handler");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            },
            WalletError::Internal(e) => {
                error!(error = ?e, "Unexpected error in handler");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            },
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
