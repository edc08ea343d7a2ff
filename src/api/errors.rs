use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::projector::error::ProjectorError;

/// Every projector failure is reported to the host as the same
/// "service communication failure" status.
#[derive(Debug)]
pub struct AppError(pub ProjectorError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.0.to_string(), "status": self.0.hap_status() }));
        (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
    }
}

impl From<ProjectorError> for AppError {
    fn from(e: ProjectorError) -> Self {
        Self(e)
    }
}
