//! Unified error handling for VoxMetrics
//!
//! Every failure in the core is scoped to a single request or webhook event.
//! This module maps each failure to a stable error code and an HTTP status so
//! the transport layer can render it without inspecting the variant.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Ingestion Errors ====================
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid webhook signature")]
    SignatureInvalid,

    // ==================== Agent Validation Errors ====================
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent ID mismatch: expected {expected}, got {received}")]
    AgentIdMismatch { expected: String, received: String },

    // ==================== Store Errors ====================
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    // ==================== Authentication Errors ====================
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    // ==================== External Service Errors ====================
    #[error("Provider API error: {0}")]
    Provider(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::InvalidPayload(_)
            | AppError::AgentIdMismatch { .. }
            | AppError::Validation(_)
            | AppError::InvalidCursor(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::SignatureInvalid
            | AppError::InvalidToken(_)
            | AppError::TokenExpired
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::AgentNotFound(_) | AppError::OrganizationNotFound(_) => {
                StatusCode::NOT_FOUND
            }

            // 502 Bad Gateway
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            AppError::Internal(_) | AppError::Config(_) | AppError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidPayload(_) => "invalid_payload",
            AppError::SignatureInvalid => "signature_invalid",
            AppError::AgentNotFound(_) => "agent_not_found",
            AppError::AgentIdMismatch { .. } => "agent_id_mismatch",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::OrganizationNotFound(_) => "organization_not_found",
            AppError::TokenExpired => "token_expired",
            AppError::InvalidToken(_) => "invalid_token",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::AuthorizationDenied(_) => "authorization_denied",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidCursor(_) => "invalid_cursor",
            AppError::Provider(_) => "provider_error",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the error was caused by the caller's input rather than by a
    /// collaborator failing.
    pub fn is_rejection(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
