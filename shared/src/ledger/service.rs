//! Ledger service: transaction boundaries around the ledger operations
//!
//! Every public method opens its own session and either commits it in full or
//! drops it. Post-commit work (backorder scan, notifications) never undoes a
//! committed order.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::bundle::effective_bundle_stock;
use super::consumption::{self, Consumption};
use super::error::{LedgerError, LedgerResult};
use super::fulfillment::{self, leaf_components, FulfilledOrder};
use super::notify::{Notifier, OrderSummary};
use super::payments::{is_settleable, rejection_reason, CallbackOutcome, PaymentGateway};
use super::replenishment::{self, Replenishment};
use super::session::{LedgerStore, StockSession};
use crate::models::{
    total_remaining, Batch, BundleComponent, GatewayCallback, NewPendingPayment, Order, OrderItem,
    OrderRequest, OrderStatus, PaymentStatus, PendingPayment, Variant,
};
use crate::types::SaleChannel;
use crate::validation::normalize_mobile_money_phone;

/// A variant together with its full batch history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantLedger {
    pub variant: Variant,
    pub batches: Vec<Batch>,
    pub remaining_in_batches: i64,
    /// Units drawn from batches by sales
    pub consumed_from_batches: i64,
    /// Value of the open batches at their own costs
    pub remaining_value: Decimal,
    /// Value of on-hand stock at the blended buying price
    pub stock_value: Decimal,
    pub backordered: bool,
    pub backorder_quantity: i64,
}

/// Derived stock of a bundle product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleStock {
    pub product_id: Uuid,
    pub stock: i64,
    pub components: Vec<BundleComponentStock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleComponentStock {
    pub variant_id: Uuid,
    pub quantity: i64,
    pub stock: i64,
}

/// An order with its line items
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Stock ledger operations bound to a store and its collaborators
pub struct LedgerService<S> {
    store: S,
    notifier: Arc<dyn Notifier>,
    gateway: Arc<dyn PaymentGateway>,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: S, notifier: Arc<dyn Notifier>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            store,
            notifier,
            gateway,
        }
    }

    /// Create an order and consume its stock in one transaction
    pub async fn fulfill(&self, request: OrderRequest) -> LedgerResult<FulfilledOrder> {
        let mut session = self.store.begin().await?;

        let fulfilled = match fulfillment::fulfill_in(&mut session, &request).await {
            Ok(fulfilled) => fulfilled,
            Err(err) => {
                session.rollback().await?;
                tracing::warn!(
                    channel = request.channel.as_str(),
                    error = %err,
                    retryable = err.is_retryable(),
                    "order fulfillment rolled back"
                );
                return Err(err);
            }
        };

        session.commit().await?;
        Ok(self.finalize(fulfilled).await)
    }

    /// Post-commit work for an order fulfilled in a caller-owned session
    ///
    /// Flags oversold orders as `backorder` and sends notifications. Failures
    /// here are logged and do not affect the committed order.
    pub async fn finalize(&self, mut fulfilled: FulfilledOrder) -> FulfilledOrder {
        match self.scan_backorder(&fulfilled).await {
            Ok(true) => fulfilled.order.status = OrderStatus::Backorder,
            Ok(false) => {}
            Err(err) => tracing::warn!(
                order_id = %fulfilled.order.id,
                error = %err,
                "backorder scan failed"
            ),
        }

        self.notify(&fulfilled).await;
        fulfilled
    }

    async fn scan_backorder(&self, fulfilled: &FulfilledOrder) -> LedgerResult<bool> {
        let mut session = self.store.begin().await?;
        let flagged = fulfillment::flag_backorder(&mut session, fulfilled).await?;
        session.commit().await?;
        Ok(flagged)
    }

    async fn notify(&self, fulfilled: &FulfilledOrder) {
        let summary = OrderSummary::new(&fulfilled.order, &fulfilled.items);

        if let Err(err) = self.notifier.notify_order_created(&summary).await {
            tracing::warn!(order_id = %summary.order_id, error = %err, "order notification failed");
        }

        if let Some(phone) = fulfilled.order.buyer_phone.as_deref() {
            if let Err(err) = self.notifier.notify_buyer_order_confirmed(phone, &summary).await {
                tracing::warn!(
                    order_id = %summary.order_id,
                    error = %err,
                    "buyer confirmation failed"
                );
            }
        }
    }

    /// Consume stock for one variant outside of any order
    pub async fn reduce_stock(&self, variant_id: Uuid, quantity: i64) -> LedgerResult<Consumption> {
        let mut session = self.store.begin().await?;
        let consumption = consumption::reduce_stock(&mut session, variant_id, quantity).await?;
        session.commit().await?;
        Ok(consumption)
    }

    /// Receive stock for a variant
    pub async fn receive_stock(
        &self,
        variant_id: Uuid,
        quantity: i64,
        unit_cost: Decimal,
    ) -> LedgerResult<Replenishment> {
        let mut session = self.store.begin().await?;
        let replenishment =
            replenishment::receive_stock(&mut session, variant_id, quantity, unit_cost).await?;
        session.commit().await?;
        Ok(replenishment)
    }

    /// A variant and all of its batches
    pub async fn variant_ledger(&self, variant_id: Uuid) -> LedgerResult<VariantLedger> {
        let mut session = self.store.begin().await?;
        let variant = session
            .load_variant(variant_id)
            .await?
            .ok_or(LedgerError::VariantNotFound(variant_id))?;
        let batches = session.list_batches(variant_id).await?;
        session.rollback().await?;

        let remaining_in_batches = total_remaining(&batches);
        let remaining_value = batches.iter().map(Batch::remaining_value).sum();
        let consumed_from_batches = batches.iter().map(Batch::consumed).sum();
        Ok(VariantLedger {
            stock_value: variant.stock_value(),
            backordered: variant.is_backordered(),
            backorder_quantity: variant.backorder_quantity(),
            variant,
            batches,
            remaining_in_batches,
            consumed_from_batches,
            remaining_value,
        })
    }

    /// Whole bundles the component stock can currently make
    ///
    /// Nested bundles are counted through their own components.
    pub async fn bundle_stock(&self, product_id: Uuid) -> LedgerResult<BundleStock> {
        let mut session = self.store.begin().await?;
        let product = session
            .load_product(product_id)
            .await?
            .filter(|p| p.is_bundle)
            .ok_or(LedgerError::ProductNotFound(product_id))?;

        let leaves = if product.consumes_components() {
            leaf_components(&mut session, &product).await?
        } else {
            Vec::new()
        };
        let leaf_ids: Vec<Uuid> = leaves.iter().map(|c| c.variant_id).collect();
        let levels = session.stock_levels(&leaf_ids).await?;
        session.rollback().await?;

        let mut components = Vec::new();
        let mut with_stock: Vec<(BundleComponent, i64)> = Vec::new();
        for component in &leaves {
            let stock = levels
                .iter()
                .find(|(id, _)| *id == component.variant_id)
                .map(|(_, stock)| *stock)
                .ok_or(LedgerError::VariantNotFound(component.variant_id))?;
            with_stock.push((*component, stock));
            components.push(BundleComponentStock {
                variant_id: component.variant_id,
                quantity: component.quantity,
                stock,
            });
        }

        Ok(BundleStock {
            product_id,
            stock: effective_bundle_stock(&with_stock),
            components,
        })
    }

    /// An order and its items
    pub async fn order(&self, order_id: Uuid) -> LedgerResult<OrderWithItems> {
        let mut session = self.store.begin().await?;
        let found = session.load_order(order_id).await?;
        session.rollback().await?;

        found
            .map(|(order, items)| OrderWithItems { order, items })
            .ok_or(LedgerError::OrderNotFound(order_id))
    }

    /// Start a mobile-money checkout for `request`
    ///
    /// Stock is not touched until the gateway confirms the payment.
    pub async fn initiate_mobile_payment(
        &self,
        phone: &str,
        mut request: OrderRequest,
    ) -> LedgerResult<PendingPayment> {
        let phone = normalize_mobile_money_phone(phone)
            .map_err(|msg| LedgerError::InvalidPhone(msg.to_string()))?;

        request.channel = SaleChannel::MobileMoney;
        request.status = OrderStatus::Paid;
        if request.buyer_phone.is_none() {
            request.buyer_phone = Some(phone.clone());
        }
        fulfillment::validate_request(&request)?;

        let reference = match request.buyer_id {
            Some(buyer_id) => format!("buyer-{}", buyer_id.simple()),
            None => "guest".to_string(),
        };
        let checkout_id = self
            .gateway
            .request_checkout(&phone, request.total_amount, &reference)
            .await
            .map_err(LedgerError::Gateway)?;

        let mut session = self.store.begin().await?;
        let pending = session
            .insert_pending_payment(NewPendingPayment {
                checkout_id,
                buyer_id: request.buyer_id,
                phone,
                amount: request.total_amount,
                request,
            })
            .await?;
        session.commit().await?;

        tracing::info!(
            checkout_id = %pending.checkout_id,
            amount = %pending.amount,
            "mobile payment initiated"
        );

        Ok(pending)
    }

    /// Current state of a mobile-money checkout
    pub async fn payment_status(&self, checkout_id: &str) -> LedgerResult<PendingPayment> {
        let mut session = self.store.begin().await?;
        let pending = session.load_pending_payment(checkout_id).await?;
        session.rollback().await?;
        pending.ok_or_else(|| LedgerError::PaymentNotFound(checkout_id.to_string()))
    }

    /// React to the gateway's asynchronous payment result
    ///
    /// Business failures are recorded on the payment instead of returned;
    /// only storage failures surface as `Err`.
    pub async fn handle_gateway_callback(
        &self,
        callback: GatewayCallback,
    ) -> LedgerResult<CallbackOutcome> {
        let checkout_id = callback.checkout_id.as_str();
        let mut session = self.store.begin().await?;

        let pending = match session.lock_pending_payment(checkout_id).await? {
            Some(pending) if is_settleable(&pending) => pending,
            Some(pending) => {
                session.rollback().await?;
                tracing::info!(
                    checkout_id,
                    status = pending.status.as_str(),
                    "duplicate callback for settled payment ignored"
                );
                return Ok(CallbackOutcome::Ignored);
            }
            None => {
                session.rollback().await?;
                tracing::warn!(checkout_id, "callback for unknown checkout ignored");
                return Ok(CallbackOutcome::Ignored);
            }
        };

        if let Some(reason) = rejection_reason(&pending, &callback) {
            session
                .settle_pending_payment(checkout_id, PaymentStatus::Failed, None, Some(reason.clone()))
                .await?;
            session.commit().await?;
            tracing::info!(checkout_id, reason = %reason, "mobile payment failed");
            return Ok(CallbackOutcome::Failed { reason });
        }

        match fulfillment::fulfill_in(&mut session, &pending.request).await {
            Ok(fulfilled) => {
                let order_id = fulfilled.order.id;
                session
                    .settle_pending_payment(checkout_id, PaymentStatus::Completed, Some(order_id), None)
                    .await?;
                session.commit().await?;
                tracing::info!(checkout_id, %order_id, "mobile payment fulfilled");

                self.finalize(fulfilled).await;
                Ok(CallbackOutcome::Completed { order_id })
            }
            Err(err) => {
                session.rollback().await?;
                let reason = err.to_string();
                self.record_failure(checkout_id, &reason).await?;
                tracing::warn!(checkout_id, reason = %reason, "paid checkout could not be fulfilled");
                Ok(CallbackOutcome::Failed { reason })
            }
        }
    }

    async fn record_failure(&self, checkout_id: &str, reason: &str) -> LedgerResult<()> {
        let mut session = self.store.begin().await?;
        match session.lock_pending_payment(checkout_id).await? {
            Some(pending) if is_settleable(&pending) => {
                session
                    .settle_pending_payment(
                        checkout_id,
                        PaymentStatus::Failed,
                        None,
                        Some(reason.to_string()),
                    )
                    .await?;
                session.commit().await
            }
            _ => session.rollback().await,
        }
    }
}
