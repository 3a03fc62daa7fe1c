//! Application error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing fields, failed business validation
    #[error("{0}")]
    BadRequest(String),
    /// Referenced key or id does not exist
    #[error("{0}")]
    NotFound(String),
    /// Domain already bound, deleting an active license, duplicate key
    #[error("{0}")]
    Conflict(String),
    /// Storage unavailable or any unclassified failure
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Callers never see internal error detail, only the taxonomy message.
        let message = match &self {
            AppError::Internal(detail) => {
                tracing::error!("internal error: {detail}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            self.status_code(),
            axum::Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Internal(format!("connection pool error: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization error: {err}"))
    }
}
