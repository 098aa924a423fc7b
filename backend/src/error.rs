//! Error handling for the Storefront backend
//!
//! Provides consistent JSON error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::ledger::LedgerError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    // External service errors
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBatchStock { .. } => AppError::InsufficientStock(err.to_string()),
            LedgerError::InvalidQuantity { ref message, .. } => AppError::Validation {
                field: "quantity".to_string(),
                message: message.clone(),
            },
            LedgerError::InvalidPrice(message) => AppError::Validation {
                field: "price".to_string(),
                message,
            },
            LedgerError::InvalidLineItem(message) => AppError::Validation {
                field: "items".to_string(),
                message,
            },
            LedgerError::InvalidPhone(message) => AppError::Validation {
                field: "phone".to_string(),
                message,
            },
            LedgerError::EmptyOrder => AppError::Validation {
                field: "items".to_string(),
                message: err.to_string(),
            },
            LedgerError::VariantNotFound(id) => AppError::NotFound(format!("Variant {}", id)),
            LedgerError::ProductNotFound(id) => AppError::NotFound(format!("Product {}", id)),
            LedgerError::OrderNotFound(id) => AppError::NotFound(format!("Order {}", id)),
            LedgerError::PaymentNotFound(id) => AppError::NotFound(format!("Payment {}", id)),
            LedgerError::TransactionConflict(message) => AppError::TransactionConflict(message),
            LedgerError::Gateway(message) => AppError::PaymentGateway(message),
            LedgerError::Serialization(message) | LedgerError::Storage(message) => {
                AppError::Internal(message)
            }
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                ),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", errors.to_string()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::InsufficientStock(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INSUFFICIENT_STOCK", message.clone()),
            ),
            AppError::TransactionConflict(_) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "TRANSACTION_CONFLICT",
                    "Stock was being updated by another sale. Please retry.",
                ),
            ),
            AppError::PaymentGateway(message) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("PAYMENT_GATEWAY_ERROR", format!("Payment gateway error: {}", message)),
            ),
            AppError::Configuration(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("CONFIGURATION_ERROR", format!("Configuration error: {}", message)),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        };

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {:?}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
