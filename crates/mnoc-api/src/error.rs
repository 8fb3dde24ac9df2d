use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mnoc_core::jobs::JobError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(#[from] JobError),
    #[error("Internal server error: {0}")]
    Internal(#[from] mnoc_core::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(ref error) => {
                tracing::error!(%error, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
