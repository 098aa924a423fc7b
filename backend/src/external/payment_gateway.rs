//! Mobile-money gateway clients

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::ledger::PaymentGateway;
use uuid::Uuid;

/// Gateway that accepts every checkout request and mints its own ids
///
/// Settlement arrives later through the public callback endpoint, exactly as
/// with a live provider.
#[derive(Debug, Clone)]
pub struct SandboxGateway {
    checkout_prefix: String,
}

impl SandboxGateway {
    /// Create a new SandboxGateway
    pub fn new(checkout_prefix: impl Into<String>) -> Self {
        Self {
            checkout_prefix: checkout_prefix.into(),
        }
    }

    fn next_checkout_id(&self) -> String {
        format!("{}_{}", self.checkout_prefix, Uuid::new_v4().simple())
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn request_checkout(
        &self,
        phone: &str,
        amount: Decimal,
        reference: &str,
    ) -> Result<String, String> {
        if amount <= Decimal::ZERO {
            return Err("Checkout amount must be positive".to_string());
        }

        let checkout_id = self.next_checkout_id();
        tracing::info!(%checkout_id, phone, %amount, reference, "sandbox checkout requested");
        Ok(checkout_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mints_prefixed_checkout_ids() {
        let gateway = SandboxGateway::new("ws_CO");
        let first = gateway
            .request_checkout("254712345678", Decimal::new(1500, 2), "guest")
            .await
            .unwrap();
        let second = gateway
            .request_checkout("254712345678", Decimal::new(1500, 2), "guest")
            .await
            .unwrap();

        assert!(first.starts_with("ws_CO_"));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let gateway = SandboxGateway::new("ws_CO");
        assert!(gateway
            .request_checkout("254712345678", Decimal::ZERO, "guest")
            .await
            .is_err());
    }
}
