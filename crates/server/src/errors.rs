use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use service::errors::{FieldError, ServiceError};

/// JSON API error carrying the HTTP status and, for validation failures, the
/// itemized list of failing fields.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub errors: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), errors: None }
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Validation Error".into(),
            errors: Some(errors),
        }
    }

    /// Map a service failure to a response. Storage detail stays in the log;
    /// the client only sees the generic per-operation message.
    pub fn from_service(err: ServiceError, storage_message: &str) -> Self {
        match err {
            ServiceError::Validation(errors) => Self::validation(errors),
            ServiceError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            ServiceError::Storage(detail) => {
                error!(detail = %detail, "storage failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, storage_message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.errors {
            Some(errors) => serde_json::json!({"error": self.message, "errors": errors}),
            None => serde_json::json!({"error": self.message}),
        };
        (self.status, Json(body)).into_response()
    }
}
