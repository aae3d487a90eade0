// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::services::session::SessionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A single failed field from request validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Media upload error: {0}")]
    Media(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Token generation failed")]
    TokenGeneration(#[from] SessionError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message shown to clients when token issuance fails.
    pub const TOKEN_GENERATION_MESSAGE: &'static str =
        "Something went wrong while generating tokens";

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Media(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::TokenGeneration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    status_code: u16,
    success: bool,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message, errors) = match self {
            AppError::BadRequest(msg) => ("bad_request", msg, None),
            AppError::Validation(fields) => (
                "validation_failed",
                "One or more fields are invalid".to_string(),
                Some(fields),
            ),
            AppError::Unauthorized(msg) => ("unauthorized", msg, None),
            AppError::NotFound(msg) => ("not_found", msg, None),
            AppError::Conflict(msg) => ("conflict", msg, None),
            AppError::Media(msg) => {
                tracing::warn!(error = %msg, "Media upload failed");
                ("media_error", "Image upload failed".to_string(), None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", "Internal server error".to_string(), None)
            }
            AppError::TokenGeneration(err) => {
                tracing::error!(error = %err, source = ?err, "Token generation failed");
                (
                    "token_generation_failed",
                    Self::TOKEN_GENERATION_MESSAGE.to_string(),
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", "Internal server error".to_string(), None)
            }
        };

        let body = ErrorResponse {
            status_code: status.as_u16(),
            success: false,
            error,
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
