use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use warbler_db::DbError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad form input (empty password, oversized message, ...).
    #[error("{0}")]
    Validation(String),

    /// Uniqueness or reference constraint rejected a write.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Integrity(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        match self {
            ApiError::Database(e) => tracing::error!(error = %e, "Database error"),
            ApiError::Internal(msg) => tracing::error!(message = %msg, "Internal error"),
            ApiError::Integrity(detail) => tracing::warn!(detail = %detail, "Integrity violation"),
            _ => tracing::debug!(error = %self, "Request rejected"),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Integrity(detail) => ApiError::Integrity(detail),
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
