//! Error types for sentinel-intel.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type for signal intelligence operations.
pub type Result<T> = std::result::Result<T, IntelError>;

/// Signal intelligence errors.
#[derive(Debug, thiserror::Error)]
pub enum IntelError {
    /// Query or upsert against the store failed
    #[error("Data access error: {0}")]
    DataAccess(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unknown action")]
    UnknownAction(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Config(#[from] sentinel_common::Error),
}

impl IntelError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::UnknownAction(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure came from the backing store.
    pub fn is_data_access(&self) -> bool {
        matches!(self, Self::DataAccess(_) | Self::Database(_))
    }
}

impl IntoResponse for IntelError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            Self::UnknownAction(_) => serde_json::json!({ "error": "Unknown action" }),
            _ => serde_json::json!({
                "error": self.to_string(),
                "success": false,
            }),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, axum::Json(body)).into_response()
    }
}
