//! Transactional session abstraction the ledger runs on
//!
//! A [`StockSession`] is one atomic unit of work. Every read made with intent
//! to write (`lock_*`) must hold the row until the session ends, so concurrent
//! consumers of the same variant serialize instead of interleaving. Dropping a
//! session without calling [`StockSession::commit`] discards all of its writes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerResult;
use crate::models::{
    Batch, NewBatch, NewOrder, NewOrderItem, NewPendingPayment, Order, OrderItem, OrderStatus,
    PaymentStatus, PendingPayment, Product, Variant,
};

/// Source of transactional sessions
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Session: StockSession;

    /// Open a new atomic unit of work
    async fn begin(&self) -> LedgerResult<Self::Session>;
}

/// Typed storage primitives used by the ledger inside one transaction
#[async_trait]
pub trait StockSession: Send {
    // Variants

    async fn load_variant(&mut self, variant_id: Uuid) -> LedgerResult<Option<Variant>>;

    /// Load a variant and hold its row for the rest of the session
    async fn lock_variant(&mut self, variant_id: Uuid) -> LedgerResult<Option<Variant>>;

    /// Apply `stock = stock + delta` and return the new stock
    async fn add_stock(&mut self, variant_id: Uuid, delta: i64) -> LedgerResult<i64>;

    async fn set_buying_price(&mut self, variant_id: Uuid, buying_price: Decimal)
        -> LedgerResult<()>;

    /// Current stock for each requested variant that exists
    async fn stock_levels(&mut self, variant_ids: &[Uuid]) -> LedgerResult<Vec<(Uuid, i64)>>;

    // Products

    async fn load_product(&mut self, product_id: Uuid) -> LedgerResult<Option<Product>>;

    // Batches

    async fn insert_batch(&mut self, batch: NewBatch) -> LedgerResult<Batch>;

    /// Batches with remaining quantity, oldest received first, rows held
    async fn lock_open_batches(&mut self, variant_id: Uuid) -> LedgerResult<Vec<Batch>>;

    /// Every batch ever received for the variant, oldest first
    async fn list_batches(&mut self, variant_id: Uuid) -> LedgerResult<Vec<Batch>>;

    /// Whether any batch was ever received for the variant
    async fn has_batch_history(&mut self, variant_id: Uuid) -> LedgerResult<bool>;

    async fn set_batch_remaining(&mut self, batch_id: i64, remaining: i64) -> LedgerResult<()>;

    // Orders

    async fn insert_order(&mut self, order: NewOrder) -> LedgerResult<Order>;

    async fn insert_order_item(&mut self, item: NewOrderItem) -> LedgerResult<OrderItem>;

    async fn set_item_unit_cost(
        &mut self,
        item_id: Uuid,
        unit_buying_price: Decimal,
    ) -> LedgerResult<()>;

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> LedgerResult<()>;

    async fn load_order(&mut self, order_id: Uuid) -> LedgerResult<Option<(Order, Vec<OrderItem>)>>;

    // Pending payments

    async fn insert_pending_payment(
        &mut self,
        payment: NewPendingPayment,
    ) -> LedgerResult<PendingPayment>;

    async fn load_pending_payment(&mut self, checkout_id: &str)
        -> LedgerResult<Option<PendingPayment>>;

    /// Load a pending payment and hold its row for the rest of the session
    async fn lock_pending_payment(&mut self, checkout_id: &str)
        -> LedgerResult<Option<PendingPayment>>;

    async fn settle_pending_payment(
        &mut self,
        checkout_id: &str,
        status: PaymentStatus,
        order_id: Option<Uuid>,
        failure_reason: Option<String>,
    ) -> LedgerResult<()>;

    // Lifecycle

    async fn commit(self) -> LedgerResult<()>;

    async fn rollback(self) -> LedgerResult<()>;
}
