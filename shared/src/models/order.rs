//! Order and line item models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::SaleChannel;

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    #[default]
    Paid,
    /// Accepted while one or more consumed variants were oversold
    Backorder,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Backorder => "backorder",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "backorder" => Ok(OrderStatus::Backorder),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

/// A sale transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Option<Uuid>,
    pub buyer_phone: Option<String>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub channel: SaleChannel,
    pub created_at: DateTime<Utc>,
}

/// A line of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub variant_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: i64,
    /// Unit sale price
    pub price: Decimal,
    /// Realized FIFO cost per unit, written once stock consumption succeeds
    pub unit_buying_price: Decimal,
    pub unit_discount: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        (self.price - self.unit_discount) * Decimal::from(self.quantity)
    }

    /// Gross margin realized on this line
    pub fn line_profit(&self) -> Decimal {
        (self.price - self.unit_discount - self.unit_buying_price) * Decimal::from(self.quantity)
    }
}

/// Order row about to be inserted
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer_id: Option<Uuid>,
    pub buyer_phone: Option<String>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub channel: SaleChannel,
}

/// Order item row about to be inserted
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub order_id: Uuid,
    pub variant_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: i64,
    pub price: Decimal,
    pub unit_buying_price: Decimal,
    pub unit_discount: Decimal,
}

/// A request to record a sale and consume its stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub buyer_id: Option<Uuid>,
    pub buyer_phone: Option<String>,
    pub total_amount: Decimal,
    /// Payment state the order is created with
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub channel: SaleChannel,
    pub items: Vec<LineItemRequest>,
}

/// One requested line
///
/// `variant_id` is the SKU being sold. For a bundle product this is the
/// bundle's own pricing variant; stock is taken from its components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemRequest {
    pub variant_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
    #[serde(default)]
    pub unit_discount: Decimal,
    pub name: String,
    pub image: Option<String>,
    pub serial_number: Option<String>,
}
