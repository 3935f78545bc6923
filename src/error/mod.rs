//! Unified error handling for Mailgrant Core

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// No grant is stored for the caller; carries the URL that starts consent
    #[error("Authorization required for user '{user_id}'")]
    AuthRequired { user_id: String, auth_url: String },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Grant operation '{operation}' failed: {message}")]
    GrantOperationFailed {
        operation: &'static str,
        message: String,
    },

    #[error("Grant store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Wrap a grant store fault so callers can tell it apart from "not found"
    pub fn grant_operation(operation: &'static str, source: AppError) -> Self {
        match source {
            already @ AppError::GrantOperationFailed { .. } => already,
            other => AppError::GrantOperationFailed {
                operation,
                message: other.to_string(),
            },
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(rename = "authUrl", skip_serializing_if = "Option::is_none")]
    auth_url: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut auth_url = None;
        let (status, error_type, message) = match &self {
            AppError::AuthRequired {
                user_id,
                auth_url: url,
            } => {
                auth_url = Some(url.clone());
                (
                    StatusCode::UNAUTHORIZED,
                    "auth_required",
                    format!(
                        "No grant found for user '{}'. Please authenticate first.",
                        user_id
                    ),
                )
            }
            AppError::InvalidMessage(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_message", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::ExchangeFailed(msg) => {
                tracing::error!("Code exchange failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "exchange_failed",
                    "Failed to exchange authorization code for grant".to_string(),
                )
            }
            AppError::DispatchFailed(msg) => {
                tracing::error!("Dispatch failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "dispatch_failed",
                    "Failed to send email".to_string(),
                )
            }
            AppError::Provider(msg) => {
                tracing::error!("Provider error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "provider_error",
                    "Mail provider request failed".to_string(),
                )
            }
            AppError::GrantOperationFailed { operation, message } => {
                tracing::error!("Grant operation '{}' failed: {}", operation, message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "grant_operation_failed",
                    "Failed to verify authentication".to_string(),
                )
            }
            AppError::StoreUnavailable(e) => {
                tracing::error!("Grant store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_unavailable",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            auth_url,
        });

        (status, body).into_response()
    }
}

// Recipient validation goes through validator derives
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidMessage(errors.to_string())
    }
}
