//! Errors raised by the stock ledger

use thiserror::Error;
use uuid::Uuid;

/// Stock ledger error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient stock for variant {variant_id}: requested {requested}, only {available} tracked in batches (short by {shortfall})", shortfall = .requested - .available)]
    InsufficientBatchStock {
        variant_id: Uuid,
        requested: i64,
        available: i64,
    },

    #[error("Invalid quantity {quantity}: {message}")]
    InvalidQuantity { quantity: i64, message: String },

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid line item: {0}")]
    InvalidLineItem(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("Variant {0} not found")]
    VariantNotFound(Uuid),

    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Payment {0} not found")]
    PaymentNotFound(String),

    #[error("Order has no line items")]
    EmptyOrder,

    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn invalid_quantity(quantity: i64, message: &str) -> Self {
        LedgerError::InvalidQuantity {
            quantity,
            message: message.to_string(),
        }
    }

    /// Whether the whole attempt may be retried from scratch
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::TransactionConflict(_))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
