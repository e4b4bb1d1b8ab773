//! Error-to-HTTP response conversion for the search proxy

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::api::DramaboxError;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Query parameter is required")]
    MissingQuery,

    /// Upstream answered with a non-success status, which is passed on
    #[error("Search failed")]
    Upstream(StatusCode),

    #[error("Internal server error")]
    Internal(#[from] DramaboxError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingQuery => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(status) => *status,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ProxyError::Internal(e) => {
                tracing::error!(error = %e, "Search proxy error");
            }
            ProxyError::Upstream(status) => {
                tracing::warn!(status = %status, "Upstream search failed");
            }
            ProxyError::MissingQuery => {}
        }

        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}
