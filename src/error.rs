// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::middleware::response::Page;
use crate::services::mailer::MailError;

/// HTTP error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
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

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Constraint(msg) => ApiError::conflict(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        tracing::error!("Invitation dispatch failed: {}", err);
        ApiError::internal_server_error("The invitation could not be sent")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// 404 and 500 render the error pages; everything else is a JSON error body
// (403s from browsers are turned into a redirect by the access middleware).
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound(_) => Page::not_found().into_response(),
            ApiError::InternalServerError(_) => Page::server_error().into_response(),
            _ => {
                let status = StatusCode::from_u16(self.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(self.to_json())).into_response()
            }
        }
    }
}
