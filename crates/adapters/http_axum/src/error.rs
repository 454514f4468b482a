//! HTTP error response mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use fleetsync_domain::error::FleetError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

/// Maps [`FleetError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(FleetError);

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(FleetError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            FleetError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            FleetError::InvalidId(_) | FleetError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            FleetError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            FleetError::Conflict(err) => (StatusCode::CONFLICT, err.to_string()),
            FleetError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                status: "error",
                message,
            }),
        )
            .into_response()
    }
}
