// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid field {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited {
        reset_at: DateTime<Utc>,
        retry_after_secs: i64,
        current: u32,
        limit: u32,
    },

    #[error("Monthly AI budget exceeded: ${current_usd:.2} of ${limit_usd:.2}")]
    CostLimitExceeded { current_usd: f64, limit_usd: f64 },

    #[error("AI request failed")]
    AiRequestFailed,

    #[error("AI request timed out")]
    AiTimeout,

    #[error("AI response could not be parsed: {0}")]
    AiResponseParse(String),

    #[error("Upstream API error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<f64>,
}

impl ErrorResponse {
    fn new(error: &str, details: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            details,
            fields: None,
            reset_at: None,
            retry_after_secs: None,
            current: None,
            limit: None,
        }
    }
}

impl AppError {
    /// Whether a model call was attempted and failed (counted in the usage ledger).
    pub fn is_ai_failure(&self) -> bool {
        matches!(
            self,
            AppError::AiRequestFailed | AppError::AiTimeout | AppError::AiResponseParse(_)
        )
    }

    /// Underlying error text, exposed to clients only in debug builds.
    fn debug_details(&self) -> Option<String> {
        cfg!(debug_assertions).then(|| self.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("unauthorized", None),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("invalid_token", None),
            ),
            AppError::Forbidden(msg) => {
                tracing::warn!(reason = %msg, "Forbidden");
                (StatusCode::FORBIDDEN, ErrorResponse::new("forbidden", None))
            }
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("not_found", Some(msg.clone())),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("bad_request", Some(msg.clone())),
            ),
            AppError::Validation(errors) => {
                let mut body = ErrorResponse::new("validation_error", None);
                body.fields = serde_json::to_value(errors.field_errors()).ok();
                (StatusCode::BAD_REQUEST, body)
            }
            AppError::InvalidField { field, message } => {
                let mut body = ErrorResponse::new("validation_error", None);
                let mut fields = serde_json::Map::new();
                fields.insert(field.to_string(), serde_json::json!([message]));
                body.fields = Some(serde_json::Value::Object(fields));
                (StatusCode::BAD_REQUEST, body)
            }
            AppError::RateLimited {
                reset_at,
                retry_after_secs,
                current,
                limit,
            } => {
                let mut body = ErrorResponse::new(
                    "rate_limited",
                    Some(format!("Try again in {} seconds", retry_after_secs)),
                );
                body.reset_at = Some(crate::time_utils::format_utc_rfc3339(*reset_at));
                body.retry_after_secs = Some(*retry_after_secs);
                body.current = Some(f64::from(*current));
                body.limit = Some(f64::from(*limit));
                (StatusCode::TOO_MANY_REQUESTS, body)
            }
            AppError::CostLimitExceeded {
                current_usd,
                limit_usd,
            } => {
                let mut body = ErrorResponse::new(
                    "cost_limit_exceeded",
                    Some("Monthly AI usage limit reached".to_string()),
                );
                body.current = Some(*current_usd);
                body.limit = Some(*limit_usd);
                (StatusCode::PAYMENT_REQUIRED, body)
            }
            AppError::AiRequestFailed => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new("ai_request_failed", None),
            ),
            AppError::AiTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse::new("ai_timeout", None),
            ),
            AppError::AiResponseParse(msg) => {
                tracing::error!(error = %msg, "AI response parse failure");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::new("ai_response_invalid", self.debug_details()),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Upstream API error");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::new("upstream_error", self.debug_details()),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("database_error", self.debug_details()),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal_error", self.debug_details()),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
