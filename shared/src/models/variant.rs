//! Purchasable SKU models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable SKU belonging to a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Color or attribute label shown to buyers
    pub label: String,
    /// Current selling price
    pub price: Decimal,
    /// Running stock counter; negative values are backordered units
    pub stock: i64,
    /// Lifetime blended unit cost of received stock, for valuation only
    pub buying_price: Decimal,
    pub profit_margin: Decimal,
    pub discount: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    /// Whether more units have been sold than are on hand
    pub fn is_backordered(&self) -> bool {
        self.stock < 0
    }

    /// Number of oversold units awaiting replenishment
    pub fn backorder_quantity(&self) -> i64 {
        (-self.stock).max(0)
    }

    /// Valuation of on-hand stock at the blended cost
    pub fn stock_value(&self) -> Decimal {
        Decimal::from(self.stock.max(0)) * self.buying_price
    }
}
