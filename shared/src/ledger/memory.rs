//! In-memory ledger store
//!
//! A session takes exclusive ownership of the whole state for its lifetime and
//! works on a private copy, which replaces the shared state on commit. This is
//! coarser than row locks but gives the same guarantees: concurrent sessions
//! serialize, and an uncommitted session leaves no trace.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::error::{LedgerError, LedgerResult};
use super::session::{LedgerStore, StockSession};
use crate::models::{
    Batch, NewBatch, NewOrder, NewOrderItem, NewPendingPayment, Order, OrderItem, OrderStatus,
    PaymentStatus, PendingPayment, Product, Variant,
};

/// Complete contents of the in-memory store
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub products: HashMap<Uuid, Product>,
    pub variants: HashMap<Uuid, Variant>,
    /// Append-only, in insertion order
    pub batches: Vec<Batch>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
    pub payments: HashMap<String, PendingPayment>,
    next_batch_id: i64,
}

impl LedgerState {
    pub fn variant(&self, variant_id: Uuid) -> Option<&Variant> {
        self.variants.get(&variant_id)
    }

    /// All batches of a variant in FIFO order
    pub fn batches_for(&self, variant_id: Uuid) -> Vec<Batch> {
        let mut batches: Vec<Batch> = self
            .batches
            .iter()
            .filter(|b| b.variant_id == variant_id)
            .cloned()
            .collect();
        batches.sort_by(|a, b| a.date_received.cmp(&b.date_received).then(a.id.cmp(&b.id)));
        batches
    }

    pub fn items_for(&self, order_id: Uuid) -> Vec<OrderItem> {
        self.order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect()
    }
}

/// Ledger store kept entirely in memory
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog product outside of any session
    pub async fn put_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    /// Add or replace a variant outside of any session
    pub async fn put_variant(&self, variant: Variant) {
        self.state.lock().await.variants.insert(variant.id, variant);
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> LedgerState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Session = InMemorySession;

    async fn begin(&self) -> LedgerResult<InMemorySession> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemorySession { guard, working })
    }
}

/// One unit of work over the in-memory store
pub struct InMemorySession {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
}

impl InMemorySession {
    fn variant_mut(&mut self, variant_id: Uuid) -> LedgerResult<&mut Variant> {
        self.working
            .variants
            .get_mut(&variant_id)
            .ok_or(LedgerError::VariantNotFound(variant_id))
    }

    fn payment_mut(&mut self, checkout_id: &str) -> LedgerResult<&mut PendingPayment> {
        self.working
            .payments
            .get_mut(checkout_id)
            .ok_or_else(|| LedgerError::PaymentNotFound(checkout_id.to_string()))
    }
}

#[async_trait]
impl StockSession for InMemorySession {
    async fn load_variant(&mut self, variant_id: Uuid) -> LedgerResult<Option<Variant>> {
        Ok(self.working.variants.get(&variant_id).cloned())
    }

    async fn lock_variant(&mut self, variant_id: Uuid) -> LedgerResult<Option<Variant>> {
        self.load_variant(variant_id).await
    }

    async fn add_stock(&mut self, variant_id: Uuid, delta: i64) -> LedgerResult<i64> {
        let variant = self.variant_mut(variant_id)?;
        variant.stock = variant
            .stock
            .checked_add(delta)
            .ok_or_else(|| LedgerError::invalid_quantity(delta, "stock counter out of range"))?;
        variant.updated_at = Utc::now();
        Ok(variant.stock)
    }

    async fn set_buying_price(
        &mut self,
        variant_id: Uuid,
        buying_price: Decimal,
    ) -> LedgerResult<()> {
        let variant = self.variant_mut(variant_id)?;
        variant.buying_price = buying_price;
        variant.updated_at = Utc::now();
        Ok(())
    }

    async fn stock_levels(&mut self, variant_ids: &[Uuid]) -> LedgerResult<Vec<(Uuid, i64)>> {
        Ok(variant_ids
            .iter()
            .filter_map(|id| self.working.variants.get(id).map(|v| (v.id, v.stock)))
            .collect())
    }

    async fn load_product(&mut self, product_id: Uuid) -> LedgerResult<Option<Product>> {
        Ok(self.working.products.get(&product_id).cloned())
    }

    async fn insert_batch(&mut self, batch: NewBatch) -> LedgerResult<Batch> {
        self.working.next_batch_id += 1;
        let batch = Batch {
            id: self.working.next_batch_id,
            variant_id: batch.variant_id,
            quantity_received: batch.quantity_received,
            buying_price: batch.buying_price,
            remaining_quantity: batch.quantity_received,
            date_received: Utc::now(),
        };
        self.working.batches.push(batch.clone());
        Ok(batch)
    }

    async fn lock_open_batches(&mut self, variant_id: Uuid) -> LedgerResult<Vec<Batch>> {
        Ok(self
            .working
            .batches_for(variant_id)
            .into_iter()
            .filter(Batch::is_open)
            .collect())
    }

    async fn list_batches(&mut self, variant_id: Uuid) -> LedgerResult<Vec<Batch>> {
        Ok(self.working.batches_for(variant_id))
    }

    async fn has_batch_history(&mut self, variant_id: Uuid) -> LedgerResult<bool> {
        Ok(self.working.batches.iter().any(|b| b.variant_id == variant_id))
    }

    async fn set_batch_remaining(&mut self, batch_id: i64, remaining: i64) -> LedgerResult<()> {
        let batch = self
            .working
            .batches
            .iter_mut()
            .find(|b| b.id == batch_id)
            .ok_or_else(|| LedgerError::Storage(format!("batch {} not found", batch_id)))?;
        batch.remaining_quantity = remaining;
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> LedgerResult<Order> {
        let order = Order {
            id: Uuid::new_v4(),
            buyer_id: order.buyer_id,
            buyer_phone: order.buyer_phone,
            total_amount: order.total_amount,
            status: order.status,
            channel: order.channel,
            created_at: Utc::now(),
        };
        self.working.orders.push(order.clone());
        Ok(order)
    }

    async fn insert_order_item(&mut self, item: NewOrderItem) -> LedgerResult<OrderItem> {
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: item.order_id,
            variant_id: item.variant_id,
            name: item.name,
            image: item.image,
            serial_number: item.serial_number,
            quantity: item.quantity,
            price: item.price,
            unit_buying_price: item.unit_buying_price,
            unit_discount: item.unit_discount,
        };
        self.working.order_items.push(item.clone());
        Ok(item)
    }

    async fn set_item_unit_cost(
        &mut self,
        item_id: Uuid,
        unit_buying_price: Decimal,
    ) -> LedgerResult<()> {
        let item = self
            .working
            .order_items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| LedgerError::Storage(format!("order item {} not found", item_id)))?;
        item.unit_buying_price = unit_buying_price;
        Ok(())
    }

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> LedgerResult<()> {
        let order = self
            .working
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        order.status = status;
        Ok(())
    }

    async fn load_order(&mut self, order_id: Uuid) -> LedgerResult<Option<(Order, Vec<OrderItem>)>> {
        Ok(self
            .working
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .map(|order| {
                let items = self.working.items_for(order.id);
                (order, items)
            }))
    }

    async fn insert_pending_payment(
        &mut self,
        payment: NewPendingPayment,
    ) -> LedgerResult<PendingPayment> {
        if self.working.payments.contains_key(&payment.checkout_id) {
            return Err(LedgerError::Storage(format!(
                "checkout {} already recorded",
                payment.checkout_id
            )));
        }
        let now = Utc::now();
        let payment = PendingPayment {
            checkout_id: payment.checkout_id,
            buyer_id: payment.buyer_id,
            phone: payment.phone,
            amount: payment.amount,
            request: payment.request,
            status: PaymentStatus::Pending,
            order_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.working
            .payments
            .insert(payment.checkout_id.clone(), payment.clone());
        Ok(payment)
    }

    async fn load_pending_payment(
        &mut self,
        checkout_id: &str,
    ) -> LedgerResult<Option<PendingPayment>> {
        Ok(self.working.payments.get(checkout_id).cloned())
    }

    async fn lock_pending_payment(
        &mut self,
        checkout_id: &str,
    ) -> LedgerResult<Option<PendingPayment>> {
        self.load_pending_payment(checkout_id).await
    }

    async fn settle_pending_payment(
        &mut self,
        checkout_id: &str,
        status: PaymentStatus,
        order_id: Option<Uuid>,
        failure_reason: Option<String>,
    ) -> LedgerResult<()> {
        let payment = self.payment_mut(checkout_id)?;
        payment.status = status;
        payment.order_id = order_id;
        payment.failure_reason = failure_reason;
        payment.updated_at = Utc::now();
        Ok(())
    }

    async fn commit(self) -> LedgerResult<()> {
        let InMemorySession { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> LedgerResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BundleOf;

    fn variant(stock: i64) -> Variant {
        Variant {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            label: "Blue".to_string(),
            price: Decimal::from(20),
            stock,
            buying_price: Decimal::ZERO,
            profit_margin: Decimal::ZERO,
            discount: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn commit_publishes_the_working_copy() {
        let store = InMemoryLedgerStore::new();
        let v = variant(5);
        store.put_variant(v.clone()).await;

        let mut session = store.begin().await.unwrap();
        assert_eq!(session.add_stock(v.id, -2).await.unwrap(), 3);
        session.commit().await.unwrap();

        assert_eq!(store.snapshot().await.variant(v.id).unwrap().stock, 3);
    }

    #[tokio::test]
    async fn dropped_session_leaves_no_trace() {
        let store = InMemoryLedgerStore::new();
        let v = variant(5);
        store.put_variant(v.clone()).await;

        {
            let mut session = store.begin().await.unwrap();
            session.add_stock(v.id, -5).await.unwrap();
            session
                .insert_batch(NewBatch {
                    variant_id: v.id,
                    quantity_received: 4,
                    buying_price: Decimal::from(3),
                })
                .await
                .unwrap();
        }

        let state = store.snapshot().await;
        assert_eq!(state.variant(v.id).unwrap().stock, 5);
        assert!(state.batches.is_empty());
    }

    #[tokio::test]
    async fn batch_ids_increase_across_sessions() {
        let store = InMemoryLedgerStore::new();
        let v = variant(0);
        store.put_variant(v.clone()).await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut session = store.begin().await.unwrap();
            let batch = session
                .insert_batch(NewBatch {
                    variant_id: v.id,
                    quantity_received: 1,
                    buying_price: Decimal::ONE,
                })
                .await
                .unwrap();
            session.commit().await.unwrap();
            ids.push(batch.id);
        }
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn duplicate_checkout_is_rejected() {
        let store = InMemoryLedgerStore::new();
        let request = crate::models::OrderRequest {
            buyer_id: None,
            buyer_phone: None,
            total_amount: Decimal::from(10),
            status: OrderStatus::Paid,
            channel: Default::default(),
            items: Vec::new(),
        };
        let new = |id: &str| NewPendingPayment {
            checkout_id: id.to_string(),
            buyer_id: None,
            phone: "254712345678".to_string(),
            amount: Decimal::from(10),
            request: request.clone(),
        };

        let mut session = store.begin().await.unwrap();
        session.insert_pending_payment(new("ws_CO_1")).await.unwrap();
        assert!(session.insert_pending_payment(new("ws_CO_1")).await.is_err());
    }

    #[tokio::test]
    async fn products_round_trip_through_the_store() {
        let store = InMemoryLedgerStore::new();
        let product = Product {
            id: Uuid::new_v4(),
            name: "Earbuds".to_string(),
            is_bundle: false,
            bundle_of: BundleOf::default(),
            is_deleted: false,
        };
        store.put_product(product.clone()).await;

        let mut session = store.begin().await.unwrap();
        assert_eq!(session.load_product(product.id).await.unwrap(), Some(product));
    }
}

