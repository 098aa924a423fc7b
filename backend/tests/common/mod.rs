//! Fixtures shared by the ledger integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::ledger::{
    InMemoryLedgerStore, LedgerService, Notifier, OrderSummary, PaymentGateway,
};
use shared::models::{
    BundleComponent, BundleOf, LineItemRequest, OrderRequest, OrderStatus, Product, Variant,
};
use shared::types::SaleChannel;
use uuid::Uuid;

pub type TestLedger = LedgerService<InMemoryLedgerStore>;

/// Notifier that records every delivery, optionally failing each one
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub created: Mutex<Vec<OrderSummary>>,
    pub buyer: Mutex<Vec<(String, OrderSummary)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn buyer_phones(&self) -> Vec<String> {
        self.buyer.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_order_created(&self, summary: &OrderSummary) -> Result<(), String> {
        self.created.lock().unwrap().push(summary.clone());
        if self.fail {
            return Err("webhook unreachable".to_string());
        }
        Ok(())
    }

    async fn notify_buyer_order_confirmed(
        &self,
        phone: &str,
        summary: &OrderSummary,
    ) -> Result<(), String> {
        self.buyer
            .lock()
            .unwrap()
            .push((phone.to_string(), summary.clone()));
        if self.fail {
            return Err("sms relay unreachable".to_string());
        }
        Ok(())
    }
}

/// Gateway handing out sequential checkout ids
#[derive(Default)]
pub struct FakeGateway {
    pub fail: bool,
    counter: AtomicU64,
    pub requests: Mutex<Vec<(String, Decimal)>>,
}

impl FakeGateway {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn request_checkout(
        &self,
        phone: &str,
        amount: Decimal,
        _reference: &str,
    ) -> Result<String, String> {
        if self.fail {
            return Err("provider unavailable".to_string());
        }
        self.requests
            .lock()
            .unwrap()
            .push((phone.to_string(), amount));
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("ws_CO_test_{}", n))
    }
}

pub struct Harness {
    pub store: InMemoryLedgerStore,
    pub ledger: Arc<TestLedger>,
    pub notifier: Arc<RecordingNotifier>,
    pub gateway: Arc<FakeGateway>,
}

pub fn harness() -> Harness {
    harness_with(RecordingNotifier::default(), FakeGateway::default())
}

pub fn harness_with(notifier: RecordingNotifier, gateway: FakeGateway) -> Harness {
    let store = InMemoryLedgerStore::new();
    let notifier = Arc::new(notifier);
    let gateway = Arc::new(gateway);
    let ledger = Arc::new(LedgerService::new(
        store.clone(),
        notifier.clone(),
        gateway.clone(),
    ));
    Harness {
        store,
        ledger,
        notifier,
        gateway,
    }
}

pub fn money(units: i64) -> Decimal {
    Decimal::from(units)
}

fn variant(product_id: Uuid, label: &str, stock: i64) -> Variant {
    Variant {
        id: Uuid::new_v4(),
        product_id,
        label: label.to_string(),
        price: money(80),
        stock,
        buying_price: Decimal::ZERO,
        profit_margin: Decimal::ZERO,
        discount: Decimal::ZERO,
        updated_at: Utc::now(),
    }
}

/// A plain product with one variant holding `stock` units and no batches
pub async fn seed_variant(store: &InMemoryLedgerStore, stock: i64) -> Uuid {
    let product = Product {
        id: Uuid::new_v4(),
        name: "Phone case".to_string(),
        is_bundle: false,
        bundle_of: BundleOf::default(),
        is_deleted: false,
    };
    let variant = variant(product.id, "Black", stock);
    let id = variant.id;
    store.put_product(product).await;
    store.put_variant(variant).await;
    id
}

/// A bundle product and its own pricing variant; returns (product id, variant id)
pub async fn seed_bundle(store: &InMemoryLedgerStore, components: &[(Uuid, i64)]) -> (Uuid, Uuid) {
    let product = Product {
        id: Uuid::new_v4(),
        name: "Starter kit".to_string(),
        is_bundle: true,
        bundle_of: BundleOf::new(
            components
                .iter()
                .map(|&(variant_id, quantity)| BundleComponent {
                    variant_id,
                    quantity,
                })
                .collect(),
        ),
        is_deleted: false,
    };
    let variant = variant(product.id, "Kit", 0);
    let ids = (product.id, variant.id);
    store.put_product(product).await;
    store.put_variant(variant).await;
    ids
}

pub fn line(variant_id: Uuid, quantity: i64, unit_price: i64) -> LineItemRequest {
    LineItemRequest {
        variant_id,
        quantity,
        unit_price: money(unit_price),
        unit_discount: Decimal::ZERO,
        name: "Phone case".to_string(),
        image: None,
        serial_number: None,
    }
}

pub fn order(channel: SaleChannel, items: Vec<LineItemRequest>) -> OrderRequest {
    let total_amount = items
        .iter()
        .map(|l| l.unit_price * Decimal::from(l.quantity))
        .sum();
    OrderRequest {
        buyer_id: Some(Uuid::new_v4()),
        buyer_phone: None,
        total_amount,
        status: OrderStatus::Paid,
        channel,
        items,
    }
}
