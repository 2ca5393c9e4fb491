//! HTTP error translation
//!
//! Maps typed service errors onto the documented status codes. Validation
//! failures come back field-keyed; everything unexpected collapses to a
//! generic 500 so internals never leak to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::utils::errors::FixlineError;

/// Wrapper giving FixlineError an HTTP representation
#[derive(Debug)]
pub struct ApiError(pub FixlineError);

impl From<FixlineError> for ApiError {
    fn from(e: FixlineError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            FixlineError::Validation { field, message } => {
                let mut body = serde_json::Map::new();
                body.insert(field.clone(), json!(message));
                (StatusCode::BAD_REQUEST, serde_json::Value::Object(body))
            }
            FixlineError::InvalidRequestState { expected, actual } => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": format!("request must be {}, got {}", expected, actual) }),
            ),
            FixlineError::Auth(message) => {
                (StatusCode::FORBIDDEN, json!({ "detail": message }))
            }
            FixlineError::UserNotFound { telegram_id } => (
                StatusCode::NOT_FOUND,
                json!({ "detail": format!("user {} not found", telegram_id) }),
            ),
            FixlineError::RequestNotFound { request_id } => (
                StatusCode::NOT_FOUND,
                json!({ "detail": format!("request {} not found", request_id) }),
            ),
            FixlineError::Conflict(message) => {
                (StatusCode::CONFLICT, json!({ "detail": message }))
            }
            // A write losing a unique-key race bypasses the service-level
            // duplicate pre-checks and surfaces as a raw database error
            other if other.is_unique_violation() => (
                StatusCode::CONFLICT,
                json!({ "detail": "resource already exists" }),
            ),
            other => {
                error!(error = %other, "Unhandled error in request handler");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let response = ApiError(FixlineError::validation("phone", "is required")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ApiError(FixlineError::UserNotFound {
            telegram_id: "42".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[derive(Debug)]
    struct DuplicateKey;

    impl std::fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for DuplicateKey {}

    impl sqlx::error::DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some("23505".into())
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn test_unique_key_race_maps_to_409() {
        let err = FixlineError::Database(sqlx::Error::Database(Box::new(DuplicateKey)));
        assert!(err.is_unique_violation());

        let response = ApiError(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_crm_error_is_opaque_500() {
        let response = ApiError(FixlineError::Crm {
            status: 402,
            body: "payment required".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
