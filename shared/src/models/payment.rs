//! Mobile-money payment records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderRequest;

/// Settlement state of a pending payment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status '{}'", other)),
        }
    }
}

/// A checkout awaiting confirmation from the payment gateway
///
/// The order is only created once the gateway confirms; until then the
/// requested order travels with the payment record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingPayment {
    pub checkout_id: String,
    pub buyer_id: Option<Uuid>,
    pub phone: String,
    pub amount: Decimal,
    pub request: OrderRequest,
    pub status: PaymentStatus,
    pub order_id: Option<Uuid>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pending payment row about to be inserted
#[derive(Debug, Clone)]
pub struct NewPendingPayment {
    pub checkout_id: String,
    pub buyer_id: Option<Uuid>,
    pub phone: String,
    pub amount: Decimal,
    pub request: OrderRequest,
}

/// Asynchronous result delivered by the payment gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayCallback {
    pub checkout_id: String,
    pub succeeded: bool,
    #[serde(default)]
    pub amount_confirmed: Decimal,
    pub failure_reason: Option<String>,
}
