//! Stock ledger tests
//!
//! Property-based and unit tests for:
//! - Property 1: Batch conservation
//! - Property 2: FIFO order
//! - Property 3: Oversell rejection without partial consumption
//! - Property 4: Exact depletion
//! - Property 6: Replenishment blending
//! - Property 7: Idempotent reads

mod common;

use common::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::ledger::LedgerError;
use shared::models::{total_received, total_remaining};
use shared::types::SaleChannel;
use std::str::FromStr;

// ============================================================================
// Unit Tests
// ============================================================================

#[tokio::test]
async fn fifo_draws_oldest_batch_first() {
    let h = harness();
    let v = seed_variant(&h.store, 0).await;

    h.ledger.receive_stock(v, 5, money(10)).await.unwrap();
    h.ledger.receive_stock(v, 5, money(20)).await.unwrap();

    let consumed = h.ledger.reduce_stock(v, 7).await.unwrap();
    assert_eq!(consumed.average_unit_cost, Decimal::from(90) / Decimal::from(7));
    assert!(consumed.tracked);

    let ledger = h.ledger.variant_ledger(v).await.unwrap();
    assert_eq!(ledger.batches[0].remaining_quantity, 0);
    assert_eq!(ledger.batches[1].remaining_quantity, 3);
    assert_eq!(ledger.remaining_in_batches, 3);
    assert_eq!(ledger.remaining_value, money(60));
    assert_eq!(ledger.consumed_from_batches, 7);
    assert_eq!(ledger.variant.stock, 3);
    // blended buying price is 15
    assert_eq!(ledger.stock_value, money(45));
    assert!(!ledger.backordered);
}

#[tokio::test]
async fn ledger_reports_backordered_units() {
    let h = harness();
    let v = seed_variant(&h.store, 1).await;
    h.ledger.reduce_stock(v, 3).await.unwrap();

    let ledger = h.ledger.variant_ledger(v).await.unwrap();
    assert!(ledger.backordered);
    assert_eq!(ledger.backorder_quantity, 2);
    assert_eq!(ledger.stock_value, Decimal::ZERO);
    assert_eq!(ledger.consumed_from_batches, 0);
}

#[tokio::test]
async fn oversell_is_rejected_without_touching_the_ledger() {
    let h = harness();
    let v = seed_variant(&h.store, 0).await;
    h.ledger.receive_stock(v, 3, money(10)).await.unwrap();
    let before = h.ledger.variant_ledger(v).await.unwrap();

    let err = h.ledger.reduce_stock(v, 5).await.unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientBatchStock {
            variant_id: v,
            requested: 5,
            available: 3,
        }
    );
    assert!(err.to_string().contains("short by 2"));

    let after = h.ledger.variant_ledger(v).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn exact_depletion_succeeds_and_the_next_sale_fails() {
    let h = harness();
    let v = seed_variant(&h.store, 0).await;
    h.ledger.receive_stock(v, 5, money(10)).await.unwrap();

    let consumed = h.ledger.reduce_stock(v, 5).await.unwrap();
    assert_eq!(consumed.stock_after, 0);

    let err = h.ledger.reduce_stock(v, 5).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBatchStock { available: 0, .. }
    ));
    assert_eq!(h.ledger.variant_ledger(v).await.unwrap().variant.stock, 0);
}

#[tokio::test]
async fn untracked_variant_sells_at_zero_cost_into_negative_stock() {
    let h = harness();
    let v = seed_variant(&h.store, 2).await;

    let consumed = h.ledger.reduce_stock(v, 5).await.unwrap();
    assert!(!consumed.tracked);
    assert_eq!(consumed.average_unit_cost, Decimal::ZERO);
    assert!(consumed.draws.is_empty());
    assert_eq!(consumed.stock_after, -3);
}

#[tokio::test]
async fn replenishment_blends_lifetime_average() {
    let h = harness();
    let v = seed_variant(&h.store, 0).await;

    let first = h.ledger.receive_stock(v, 10, money(5)).await.unwrap();
    assert_eq!(first.variant.stock, 10);
    assert_eq!(first.variant.buying_price, money(5));
    assert_eq!(first.batch.remaining_quantity, 10);

    let second = h.ledger.receive_stock(v, 10, money(15)).await.unwrap();
    assert_eq!(second.variant.stock, 20);
    assert_eq!(second.variant.buying_price, money(10));
}

#[tokio::test]
async fn blended_average_and_fifo_cost_diverge() {
    let h = harness();
    let v = seed_variant(&h.store, 0).await;
    h.ledger.receive_stock(v, 10, money(5)).await.unwrap();
    h.ledger.receive_stock(v, 10, money(15)).await.unwrap();

    let consumed = h.ledger.reduce_stock(v, 10).await.unwrap();
    assert_eq!(consumed.average_unit_cost, money(5));

    let ledger = h.ledger.variant_ledger(v).await.unwrap();
    assert_eq!(ledger.variant.buying_price, money(10));
    assert_eq!(ledger.variant.stock, 10);
}

#[tokio::test]
async fn blended_average_is_rounded_to_cents() {
    let h = harness();
    let v = seed_variant(&h.store, 0).await;
    h.ledger.receive_stock(v, 2, money(1)).await.unwrap();
    let r = h.ledger.receive_stock(v, 1, money(2)).await.unwrap();
    assert_eq!(r.variant.buying_price, Decimal::from_str("1.33").unwrap());
}

#[tokio::test]
async fn invalid_replenishment_is_rejected_before_any_write() {
    let h = harness();
    let v = seed_variant(&h.store, 4).await;

    assert!(matches!(
        h.ledger.receive_stock(v, 0, money(5)).await,
        Err(LedgerError::InvalidQuantity { quantity: 0, .. })
    ));
    assert!(matches!(
        h.ledger.receive_stock(v, 3, money(-1)).await,
        Err(LedgerError::InvalidPrice(_))
    ));
    // costs are stored to the cent
    assert!(matches!(
        h.ledger.receive_stock(v, 3, Decimal::from_str("1.005").unwrap()).await,
        Err(LedgerError::InvalidPrice(_))
    ));

    let ledger = h.ledger.variant_ledger(v).await.unwrap();
    assert_eq!(ledger.variant.stock, 4);
    assert!(ledger.batches.is_empty());
}

#[tokio::test]
async fn unknown_variant_is_reported() {
    let h = harness();
    let missing = uuid::Uuid::new_v4();

    assert_eq!(
        h.ledger.receive_stock(missing, 1, money(1)).await.unwrap_err(),
        LedgerError::VariantNotFound(missing)
    );
    assert_eq!(
        h.ledger.reduce_stock(missing, 1).await.unwrap_err(),
        LedgerError::VariantNotFound(missing)
    );
}

#[tokio::test]
async fn non_positive_sale_quantity_is_rejected() {
    let h = harness();
    let v = seed_variant(&h.store, 0).await;
    h.ledger.receive_stock(v, 5, money(10)).await.unwrap();

    for quantity in [0, -3] {
        assert!(matches!(
            h.ledger.reduce_stock(v, quantity).await,
            Err(LedgerError::InvalidQuantity { .. })
        ));
    }
    assert_eq!(h.ledger.variant_ledger(v).await.unwrap().remaining_in_batches, 5);
}

#[tokio::test]
async fn reads_have_no_side_effects() {
    let h = harness();
    let v = seed_variant(&h.store, 0).await;
    h.ledger.receive_stock(v, 8, money(12)).await.unwrap();
    h.ledger.reduce_stock(v, 3).await.unwrap();

    let first = h.ledger.variant_ledger(v).await.unwrap();
    let second = h.ledger.variant_ledger(v).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn end_to_end_receive_sell_and_reject() {
    let h = harness();
    let v = seed_variant(&h.store, 0).await;

    let received = h.ledger.receive_stock(v, 100, money(50)).await.unwrap();
    assert_eq!(received.variant.stock, 100);
    assert_eq!(received.variant.buying_price, money(50));

    let sold = h
        .ledger
        .fulfill(order(SaleChannel::Web, vec![line(v, 30, 80)]))
        .await
        .unwrap();
    assert_eq!(sold.items[0].unit_buying_price, Decimal::from_str("50.00").unwrap());

    let ledger = h.ledger.variant_ledger(v).await.unwrap();
    assert_eq!(ledger.variant.stock, 70);
    assert_eq!(ledger.batches[0].remaining_quantity, 70);

    let err = h
        .ledger
        .fulfill(order(SaleChannel::Web, vec![line(v, 80, 80)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBatchStock {
            requested: 80,
            available: 70,
            ..
        }
    ));

    let state = h.store.snapshot().await;
    assert_eq!(state.orders.len(), 1);
    assert_eq!(state.order_items.len(), 1);
    assert_eq!(state.variant(v).unwrap().stock, 70);
}

// ============================================================================
// Property Test Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum LedgerOp {
    Receive { quantity: i64, unit_cost: i64 },
    Sell { quantity: i64 },
}

fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (1i64..=20, 0i64..=100).prop_map(|(quantity, unit_cost)| LedgerOp::Receive {
            quantity,
            unit_cost
        }),
        (1i64..=30).prop_map(|quantity| LedgerOp::Sell { quantity }),
    ]
}

/// Batch totals after running `ops`: (received, remaining, consumed via batches, stock, expected stock)
fn run_ops(ops: &[LedgerOp]) -> (i64, i64, i64, i64, i64) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let h = harness();
        let v = seed_variant(&h.store, 0).await;
        let mut consumed_via_batches = 0;
        let mut expected_stock = 0;

        for op in ops {
            match *op {
                LedgerOp::Receive {
                    quantity,
                    unit_cost,
                } => {
                    h.ledger
                        .receive_stock(v, quantity, money(unit_cost))
                        .await
                        .unwrap();
                    expected_stock += quantity;
                }
                LedgerOp::Sell { quantity } => {
                    if let Ok(consumption) = h.ledger.reduce_stock(v, quantity).await {
                        if consumption.tracked {
                            consumed_via_batches += quantity;
                        }
                        expected_stock -= quantity;
                    }
                }
            }
        }

        let ledger = h.ledger.variant_ledger(v).await.unwrap();
        (
            total_received(&ledger.batches),
            total_remaining(&ledger.batches),
            consumed_via_batches,
            ledger.variant.stock,
            expected_stock,
        )
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Remaining batch quantity always equals received minus consumed
    #[test]
    fn prop_batch_conservation(ops in prop::collection::vec(ledger_op_strategy(), 1..20)) {
        let (received, remaining, consumed, stock, expected_stock) = run_ops(&ops);
        prop_assert_eq!(remaining, received - consumed);
        prop_assert_eq!(stock, expected_stock);
        prop_assert!(remaining >= 0);
    }

    /// FIFO cost of a sale spanning two batches is their weighted mix
    #[test]
    fn prop_fifo_cost_spans_batches(
        first_qty in 1i64..=20,
        second_qty in 1i64..=20,
        first_cost in 0i64..=100,
        second_cost in 0i64..=100,
        extra in 0i64..=20,
    ) {
        let extra = extra.min(second_qty);
        let sell = first_qty + extra;

        let rt = tokio::runtime::Runtime::new().unwrap();
        let average = rt.block_on(async {
            let h = harness();
            let v = seed_variant(&h.store, 0).await;
            h.ledger.receive_stock(v, first_qty, money(first_cost)).await.unwrap();
            h.ledger.receive_stock(v, second_qty, money(second_cost)).await.unwrap();
            h.ledger.reduce_stock(v, sell).await.unwrap().average_unit_cost
        });

        let expected = (Decimal::from(first_qty * first_cost) + Decimal::from(extra * second_cost))
            / Decimal::from(sell);
        prop_assert_eq!(average, expected);
    }

    /// Blended buying price stays between the lowest and highest batch cost
    #[test]
    fn prop_blended_price_is_bounded(
        receipts in prop::collection::vec((1i64..=50, 0i64..=200), 1..8)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let price = rt.block_on(async {
            let h = harness();
            let v = seed_variant(&h.store, 0).await;
            let mut last = Decimal::ZERO;
            for (quantity, cost) in &receipts {
                last = h.ledger.receive_stock(v, *quantity, money(*cost)).await.unwrap().variant.buying_price;
            }
            last
        });

        let min = receipts.iter().map(|(_, c)| *c).min().unwrap();
        let max = receipts.iter().map(|(_, c)| *c).max().unwrap();
        prop_assert!(price >= money(min) - Decimal::from_str("0.01").unwrap());
        prop_assert!(price <= money(max) + Decimal::from_str("0.01").unwrap());
    }
}
