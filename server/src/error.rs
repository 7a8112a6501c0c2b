//! Mapping of library errors to JSON HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use maintdesk::MaintError;
use serde_json::{Map, Value};

pub mod code {
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const READ_ONLY: &str = "READ_ONLY";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Error returned by handlers: `{ "code", "message", ...counts }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    /// Extra numeric fields, such as the documents blocking a delete.
    pub counts: Vec<(&'static str, u64)>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            counts: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code::INTERNAL, message)
    }
}

impl From<MaintError> for ApiError {
    fn from(err: MaintError) -> Self {
        let message = err.to_string();
        match err {
            MaintError::Validation(_) => {
                Self::new(StatusCode::BAD_REQUEST, code::VALIDATION_FAILED, message)
            }
            MaintError::InvalidTransition { .. } => {
                Self::new(StatusCode::BAD_REQUEST, code::INVALID_TRANSITION, message)
            }
            MaintError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, code::NOT_FOUND, message),
            MaintError::Conflict { blocking, .. } => Self {
                counts: blocking,
                ..Self::new(StatusCode::CONFLICT, code::CONFLICT, message)
            },
            MaintError::ReadOnly(_) => Self::new(StatusCode::FORBIDDEN, code::READ_ONLY, message),
            MaintError::Database(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                code::STORAGE_ERROR,
                message,
            ),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, "{}", self.message);
        } else {
            tracing::warn!(code = self.code, status = self.status.as_u16(), "{}", self.message);
        }

        let mut body = Map::new();
        body.insert("code".into(), Value::from(self.code));
        body.insert("message".into(), Value::from(self.message));
        for (key, count) in self.counts {
            body.insert(key.into(), Value::from(count));
        }
        (self.status, Json(Value::Object(body))).into_response()
    }
}
