use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use tavern_database::RepositoryError;
use tavern_runtime::DomainError;

/// Success envelope: `{"success": true, "message": ..., <entity|entities>: ...}`.
/// The payload's top-level keys are merged into the envelope.
#[derive(Debug, Clone)]
pub struct AppSuccess {
    pub status: StatusCode,
    pub message: String,
    pub payload: Value,
}

impl AppSuccess {
    pub fn new(status: StatusCode, message: &str, payload: Value) -> Self {
        Self {
            status,
            message: message.to_string(),
            payload,
        }
    }
}

impl IntoResponse for AppSuccess {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": true,
            "message": self.message,
        });
        if let (Some(envelope), Value::Object(extra)) = (body.as_object_mut(), self.payload) {
            for (key, value) in extra {
                envelope.insert(key, value);
            }
        }
        (self.status, Json(body)).into_response()
    }
}

// Make our own error that wraps `anyhow::Error`.
#[derive(Debug)]
pub struct AppError(pub StatusCode, pub anyhow::Error);

impl AppError {
    pub fn new(status: StatusCode, err: anyhow::Error) -> Self {
        Self(status, err)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, err)
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("CODE: {}, MESSAGE: {}", self.0.as_u16(), self.1);
        let body = json!({
            "success": false,
            "error": self.1.to_string(),
        });
        (self.0, Json(body)).into_response()
    }
}

/// This enables `?` on functions returning `Result<_, DomainError>` inside
/// handlers: each taxonomy variant carries its status code.
impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let status = match &err {
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Unauthenticated => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Repository(repo_err) => match repo_err {
                RepositoryError::DuplicateParticipant { .. }
                | RepositoryError::DuplicateValue { .. } => StatusCode::CONFLICT,
                RepositoryError::RowNotFound { .. } => StatusCode::NOT_FOUND,
                RepositoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };
        Self(status, anyhow::Error::new(err))
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::from(DomainError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_their_status_codes() {
        let cases = [
            (DomainError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (DomainError::NotFound("session"), StatusCode::NOT_FOUND),
            (DomainError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (DomainError::Forbidden("nope"), StatusCode::FORBIDDEN),
            (DomainError::Conflict("dup".into()), StatusCode::CONFLICT),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).0, expected);
        }
    }
}
