//! HTTP rendering of [`KpiLensError`].

use crate::error::KpiLensError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

/// Error returned by the API handlers: a status code plus a message the page
/// shows verbatim.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

/// Status code for each error kind.
pub fn status_for(err: &KpiLensError) -> StatusCode {
    match err {
        KpiLensError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        KpiLensError::ServiceUnreachable { .. } | KpiLensError::ModelNotFound { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        KpiLensError::InferenceTimeout { .. } | KpiLensError::DownloadTimeout { .. } => {
            StatusCode::GATEWAY_TIMEOUT
        }
        KpiLensError::InferenceFailed { .. }
        | KpiLensError::EmptyResponse { .. }
        | KpiLensError::DownloadFailed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<KpiLensError> for ApiError {
    fn from(err: KpiLensError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!(status = status.as_u16(), "{}", err);
        } else {
            warn!(status = status.as_u16(), "{}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
