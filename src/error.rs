// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::validate::FieldError;

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Every failure leaving a handler is normalized into one of these
/// variants and rendered as the canonical envelope
/// `{error, message, details?, request_id, timestamp}`.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Vec<FieldError>,
    },
    InvalidIdentifier(String),

    // 401 Unauthorized
    Unauthenticated(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 429 Too Many Requests
    TooManyRequests { message: String, retry_after_secs: u64 },

    // 500 Internal Server Error (including upstream-service failures;
    // details are logged server-side, never echoed)
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "DUPLICATE_KEY",
            ApiError::TooManyRequests { .. } => "RATE_LIMITED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidIdentifier(msg) => msg,
            ApiError::Unauthenticated(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::TooManyRequests { message, .. } => message,
            ApiError::Internal(msg) => msg,
        }
    }

    /// Canonical error envelope. The request id matches the
    /// `x-request-id` response header when rendered inside the
    /// request-id middleware; outside it (unit tests) a fresh id is
    /// minted.
    pub fn to_json(&self) -> Value {
        let request_id = crate::middleware::request_id::current_request_id()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut envelope = json!({
            "error": self.error_code(),
            "message": self.message(),
            "request_id": request_id,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let ApiError::ValidationError { field_errors, .. } = self {
            envelope["details"] = json!(field_errors);
        }

        envelope
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Vec<FieldError>) -> Self {
        ApiError::ValidationError { message: message.into(), field_errors }
    }

    pub fn invalid_identifier(value: impl std::fmt::Display) -> Self {
        ApiError::InvalidIdentifier(format!("Invalid identifier: {}", value))
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>, retry_after_secs: u64) -> Self {
        ApiError::TooManyRequests { message: message.into(), retry_after_secs }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// Upstream payment-gateway or AI-provider failure. The detail is
    /// logged server-side; the client sees a generic message.
    pub fn upstream(service: &str, detail: impl std::fmt::Display) -> Self {
        tracing::error!("{} request failed: {}", service, detail);
        ApiError::Internal(format!("The {} service could not process the request", service))
    }
}

// Convert other error types to ApiError
impl From<crate::validate::ValidationErrors> for ApiError {
    fn from(err: crate::validate::ValidationErrors) -> Self {
        ApiError::validation_error("Request validation failed", err.0)
    }
}

impl From<crate::types::InvalidObjectId> for ApiError {
    fn from(err: crate::types::InvalidObjectId) -> Self {
        ApiError::invalid_identifier(err.0)
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::ConfigMissing(_) => {
                tracing::error!("Database configuration missing");
                ApiError::internal("Service is not configured correctly")
            }
            crate::database::manager::DatabaseError::Sqlx(e) => e.into(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Record not found"),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                ApiError::conflict("A record with the same unique value already exists")
            }
            _ => {
                // Never expose internal database errors to clients
                tracing::error!("Database error: {}", err);
                ApiError::internal("An error occurred while processing your request")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let mut response = (status, Json(self.to_json())).into_response();

        if let ApiError::TooManyRequests { retry_after_secs, .. } = self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response.headers_mut().insert("retry-after", value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(ApiError::validation_error("bad", vec![]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::invalid_identifier("xyz").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthenticated("no session").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("wrong role").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("gone").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("dup").status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::too_many_requests("slow down", 30).status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::internal("boom").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_carries_request_id_and_timestamp() {
        let envelope = ApiError::not_found("Record not found").to_json();
        assert_eq!(envelope["error"], "NOT_FOUND");
        assert_eq!(envelope["message"], "Record not found");
        assert!(envelope["request_id"].as_str().is_some());
        assert!(envelope["timestamp"].as_str().unwrap().contains('T'));
        assert!(envelope.get("details").is_none());
    }

    #[test]
    fn validation_envelope_includes_field_details() {
        let errors = vec![FieldError {
            field: "email".to_string(),
            message: "This field is required".to_string(),
        }];
        let envelope = ApiError::validation_error("Request validation failed", errors).to_json();
        assert_eq!(envelope["details"][0]["field"], "email");
    }
}
