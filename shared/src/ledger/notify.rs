//! Fire-and-forget notification hooks

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderStatus};
use crate::types::SaleChannel;

/// Summary sent to staff and buyers once an order is committed
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub channel: SaleChannel,
    pub total_amount: Decimal,
    pub items: Vec<OrderSummaryLine>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderSummaryLine {
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
}

impl OrderSummary {
    pub fn new(order: &Order, items: &[OrderItem]) -> Self {
        Self {
            order_id: order.id,
            status: order.status,
            channel: order.channel,
            total_amount: order.total_amount,
            items: items
                .iter()
                .map(|i| OrderSummaryLine {
                    name: i.name.clone(),
                    quantity: i.quantity,
                    price: i.price,
                })
                .collect(),
            created_at: order.created_at,
        }
    }

    /// Short plain-text form for SMS delivery
    pub fn to_text(&self) -> String {
        let lines: Vec<String> = self
            .items
            .iter()
            .map(|l| format!("{} x{}", l.name, l.quantity))
            .collect();
        format!(
            "Order {} confirmed: {}. Total {}",
            self.order_id,
            lines.join(", "),
            self.total_amount
        )
    }
}

/// Delivery of order notifications
///
/// Failures are reported to the caller, who only logs them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_order_created(&self, summary: &OrderSummary) -> Result<(), String>;

    async fn notify_buyer_order_confirmed(
        &self,
        phone: &str,
        summary: &OrderSummary,
    ) -> Result<(), String>;
}
