use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use hk_core::error::{ErrorKind, HostError};

/// Every handler failure ends up here and is rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Host(HostError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Host(e) => match e.kind() {
                ErrorKind::Configuration | ErrorKind::Input => StatusCode::BAD_REQUEST,
                ErrorKind::Environment => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<HostError> for ApiError {
    fn from(e: HostError) -> Self {
        Self::Host(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::BadRequest(m) => m.clone(),
            Self::Host(e) => e.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::debug!(%status, error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
