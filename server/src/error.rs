use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared::ErrorBody;

use crate::proxy::ProxyError;

const EMPTY_TEXT_MESSAGE: &str = "Missing \"text\" in request body";
const MISCONFIGURED_MESSAGE: &str = "Server misconfigured: missing Dialogflow credentials";
const UPSTREAM_MESSAGE: &str = "Failed to reach the language service";

/// Errors rendered as `{error}` with a matching status code.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Validation => ApiError::BadRequest(EMPTY_TEXT_MESSAGE.to_owned()),
            ProxyError::Configuration(reason) => {
                tracing::error!(%reason, "proxy request rejected, NLU client not configured");
                ApiError::Internal(MISCONFIGURED_MESSAGE.to_owned())
            }
            ProxyError::Upstream(source) => {
                tracing::error!(error = %source, "NLU call failed");
                ApiError::Internal(UPSTREAM_MESSAGE.to_owned())
            }
        }
    }
}
