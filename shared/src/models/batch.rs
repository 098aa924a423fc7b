//! Stock receipt batches used for FIFO costing

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stock receipt event for a variant
///
/// `quantity_received` and `buying_price` never change after creation;
/// `remaining_quantity` only ever decreases and stays within
/// `0..=quantity_received`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub id: i64,
    pub variant_id: Uuid,
    pub quantity_received: i64,
    /// Unit cost at time of receipt
    pub buying_price: Decimal,
    pub remaining_quantity: i64,
    pub date_received: DateTime<Utc>,
}

impl Batch {
    /// Units already consumed by sales
    pub fn consumed(&self) -> i64 {
        self.quantity_received - self.remaining_quantity
    }

    pub fn is_open(&self) -> bool {
        self.remaining_quantity > 0
    }

    /// Cost of the units still on hand in this batch
    pub fn remaining_value(&self) -> Decimal {
        Decimal::from(self.remaining_quantity) * self.buying_price
    }
}

/// A batch about to be appended to the ledger
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub variant_id: Uuid,
    pub quantity_received: i64,
    pub buying_price: Decimal,
}

/// Sum of remaining quantities across batches
pub fn total_remaining(batches: &[Batch]) -> i64 {
    batches.iter().map(|b| b.remaining_quantity).sum()
}

/// Sum of received quantities across batches
pub fn total_received(batches: &[Batch]) -> i64 {
    batches.iter().map(|b| b.quantity_received).sum()
}
