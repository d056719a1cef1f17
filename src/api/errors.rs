use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::ServiceError;

#[derive(Debug)]
pub struct AppError(pub ServiceError);

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            ServiceError::NotFound(_) | ServiceError::NoData => StatusCode::NOT_FOUND,
            ServiceError::ModeConflict { .. } => StatusCode::CONFLICT,
            ServiceError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::MissingParameter(_)
            | ServiceError::InvalidBody(_)
            | ServiceError::InvalidRange(_)
            | ServiceError::InvalidMode(_)
            | ServiceError::InvalidStatus(_)
            | ServiceError::NoFieldsProvided
            | ServiceError::OutOfRange(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = match &self.0 {
            ServiceError::ModeConflict { current_mode } => json!({
                "error": self.0.to_string(),
                "current_mode": current_mode,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl<E: Into<ServiceError>> From<E> for AppError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}
