//! Mobile-money checkout settlement rules

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{GatewayCallback, PaymentStatus, PendingPayment};

/// Payment provider able to start a checkout on the buyer's phone
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Ask the provider to prompt `phone` for `amount`; returns its checkout id
    async fn request_checkout(
        &self,
        phone: &str,
        amount: Decimal,
        reference: &str,
    ) -> Result<String, String>;
}

/// What a gateway callback did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// Order created and payment marked completed
    Completed { order_id: Uuid },
    /// Payment marked failed; no order exists
    Failed { reason: String },
    /// Unknown or already-settled checkout; nothing changed
    Ignored,
}

/// Why a callback must not lead to fulfillment, if it must not
pub fn rejection_reason(pending: &PendingPayment, callback: &GatewayCallback) -> Option<String> {
    if !callback.succeeded {
        return Some(
            callback
                .failure_reason
                .clone()
                .unwrap_or_else(|| "payment was not completed".to_string()),
        );
    }
    if callback.amount_confirmed < pending.amount {
        return Some(format!(
            "confirmed amount {} is less than expected {}",
            callback.amount_confirmed, pending.amount
        ));
    }
    None
}

/// Whether a callback may still change the payment
pub fn is_settleable(pending: &PendingPayment) -> bool {
    pending.status == PaymentStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderRequest, OrderStatus};
    use crate::types::SaleChannel;
    use chrono::Utc;

    fn pending(amount: i64) -> PendingPayment {
        PendingPayment {
            checkout_id: "ws_CO_1".to_string(),
            buyer_id: None,
            phone: "254712345678".to_string(),
            amount: Decimal::from(amount),
            request: OrderRequest {
                buyer_id: None,
                buyer_phone: None,
                total_amount: Decimal::from(amount),
                status: OrderStatus::Paid,
                channel: SaleChannel::MobileMoney,
                items: Vec::new(),
            },
            status: PaymentStatus::Pending,
            order_id: None,
            failure_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn callback(succeeded: bool, amount: i64) -> GatewayCallback {
        GatewayCallback {
            checkout_id: "ws_CO_1".to_string(),
            succeeded,
            amount_confirmed: Decimal::from(amount),
            failure_reason: None,
        }
    }

    #[test]
    fn successful_full_payment_is_accepted() {
        assert_eq!(rejection_reason(&pending(100), &callback(true, 100)), None);
    }

    #[test]
    fn gateway_failure_reason_is_kept() {
        let mut cb = callback(false, 0);
        cb.failure_reason = Some("Request cancelled by user".to_string());
        assert_eq!(
            rejection_reason(&pending(100), &cb).as_deref(),
            Some("Request cancelled by user")
        );
    }

    #[test]
    fn short_payment_is_rejected() {
        let reason = rejection_reason(&pending(100), &callback(true, 60)).unwrap();
        assert!(reason.contains("less than expected"));
    }

    #[test]
    fn settled_payments_cannot_change() {
        let mut p = pending(100);
        assert!(is_settleable(&p));
        p.status = PaymentStatus::Failed;
        assert!(!is_settleable(&p));
    }
}
