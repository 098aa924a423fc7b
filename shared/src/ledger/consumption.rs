//! FIFO stock consumption
//!
//! A sale is allocated across open batches oldest-first. The allocation is
//! planned in full before anything is written: if the open batches cannot
//! cover the sale, nothing is touched and `InsufficientBatchStock` is raised.
//! Once the batches cover it, the full quantity comes off the stock counter.
//!
//! A variant that has never received a batch is untracked. Its sales cost
//! zero and still decrement the counter, which is how stock goes negative.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::batches;
use super::error::{LedgerError, LedgerResult};
use super::session::StockSession;
use super::stock;
use crate::models::Batch;

/// Units taken from one batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchDraw {
    pub batch_id: i64,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub remaining_after: i64,
}

/// Planned allocation of a sale across batches
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FifoAllocation {
    pub draws: Vec<BatchDraw>,
    /// Units covered by batches
    pub quantity: i64,
    pub total_cost: Decimal,
}

impl FifoAllocation {
    /// Weighted average cost of the allocated units, zero when nothing was drawn
    pub fn average_unit_cost(&self) -> Decimal {
        if self.quantity == 0 {
            return Decimal::ZERO;
        }
        self.total_cost / Decimal::from(self.quantity)
    }
}

/// Result of consuming stock for one variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consumption {
    pub variant_id: Uuid,
    pub quantity: i64,
    pub average_unit_cost: Decimal,
    pub draws: Vec<BatchDraw>,
    pub stock_after: i64,
    /// False when the variant has no batch history and was sold at zero cost
    pub tracked: bool,
}

/// Plan the oldest-first allocation of `quantity` units across `batches`
///
/// Batches are ordered by receipt time, then id; closed batches are skipped.
pub fn plan_fifo(variant_id: Uuid, batches: &[Batch], quantity: i64) -> LedgerResult<FifoAllocation> {
    if quantity <= 0 {
        return Err(LedgerError::invalid_quantity(quantity, "sale quantity must be positive"));
    }

    let mut ordered: Vec<&Batch> = batches.iter().filter(|b| b.is_open()).collect();
    ordered.sort_by(|a, b| a.date_received.cmp(&b.date_received).then(a.id.cmp(&b.id)));

    let mut allocation = FifoAllocation::default();
    let mut remaining_need = quantity;

    for batch in ordered {
        if remaining_need == 0 {
            break;
        }
        let take = remaining_need.min(batch.remaining_quantity);
        allocation.draws.push(BatchDraw {
            batch_id: batch.id,
            quantity: take,
            unit_cost: batch.buying_price,
            remaining_after: batch.remaining_quantity - take,
        });
        allocation.total_cost += Decimal::from(take) * batch.buying_price;
        allocation.quantity += take;
        remaining_need -= take;
    }

    if remaining_need > 0 {
        return Err(LedgerError::InsufficientBatchStock {
            variant_id,
            requested: quantity,
            available: allocation.quantity,
        });
    }

    Ok(allocation)
}

/// Consume `quantity` units of a variant inside the caller's session
///
/// Returns the FIFO cost of the consumed units. On error the session has not
/// been written to by this call; the caller still decides whether to roll back.
pub async fn reduce_stock<S: StockSession>(
    session: &mut S,
    variant_id: Uuid,
    quantity: i64,
) -> LedgerResult<Consumption> {
    if quantity <= 0 {
        return Err(LedgerError::invalid_quantity(quantity, "sale quantity must be positive"));
    }

    session
        .lock_variant(variant_id)
        .await?
        .ok_or(LedgerError::VariantNotFound(variant_id))?;

    let open = batches::open_batches(session, variant_id).await?;

    if open.is_empty() && !session.has_batch_history(variant_id).await? {
        let stock_after = stock::adjust_stock(session, variant_id, -quantity).await?;
        tracing::warn!(
            %variant_id,
            quantity,
            stock_after,
            "variant has never been received; sold at zero cost"
        );
        return Ok(Consumption {
            variant_id,
            quantity,
            average_unit_cost: Decimal::ZERO,
            draws: Vec::new(),
            stock_after,
            tracked: false,
        });
    }

    let allocation = plan_fifo(variant_id, &open, quantity)?;

    for draw in &allocation.draws {
        batches::update_remaining(session, draw.batch_id, draw.remaining_after).await?;
        tracing::debug!(
            %variant_id,
            batch_id = draw.batch_id,
            taken = draw.quantity,
            remaining = draw.remaining_after,
            unit_cost = %draw.unit_cost,
            "batch drawn"
        );
    }

    let stock_after = stock::adjust_stock(session, variant_id, -quantity).await?;
    let average_unit_cost = allocation.average_unit_cost();

    Ok(Consumption {
        variant_id,
        quantity,
        average_unit_cost,
        draws: allocation.draws,
        stock_after,
        tracked: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn batch(id: i64, remaining: i64, cost: i64, age_days: i64) -> Batch {
        Batch {
            id,
            variant_id: Uuid::nil(),
            quantity_received: remaining,
            buying_price: Decimal::from(cost),
            remaining_quantity: remaining,
            date_received: Utc::now() - Duration::days(age_days),
        }
    }

    #[test]
    fn draws_oldest_batch_first() {
        let batches = vec![batch(2, 5, 20, 1), batch(1, 5, 10, 2)];
        let plan = plan_fifo(Uuid::nil(), &batches, 7).unwrap();

        assert_eq!(plan.draws.len(), 2);
        assert_eq!(plan.draws[0].batch_id, 1);
        assert_eq!(plan.draws[0].remaining_after, 0);
        assert_eq!(plan.draws[1].batch_id, 2);
        assert_eq!(plan.draws[1].remaining_after, 3);
        assert_eq!(plan.total_cost, Decimal::from(90));
        assert_eq!(plan.average_unit_cost(), Decimal::from(90) / Decimal::from(7));
    }

    #[test]
    fn same_receipt_time_falls_back_to_batch_id() {
        let now = Utc::now();
        let mut first = batch(1, 2, 10, 0);
        let mut second = batch(2, 2, 30, 0);
        first.date_received = now;
        second.date_received = now;

        let plan = plan_fifo(Uuid::nil(), &[second, first], 1).unwrap();
        assert_eq!(plan.draws[0].batch_id, 1);
        assert_eq!(plan.average_unit_cost(), Decimal::from(10));
    }

    #[test]
    fn closed_batches_are_skipped() {
        let mut closed = batch(1, 5, 99, 3);
        closed.remaining_quantity = 0;
        let plan = plan_fifo(Uuid::nil(), &[closed, batch(2, 4, 10, 1)], 4).unwrap();
        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.draws[0].batch_id, 2);
    }

    #[test]
    fn shortfall_reports_what_was_available() {
        let err = plan_fifo(Uuid::nil(), &[batch(1, 3, 10, 1)], 5).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBatchStock {
                variant_id: Uuid::nil(),
                requested: 5,
                available: 3,
            }
        );
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        assert!(matches!(
            plan_fifo(Uuid::nil(), &[batch(1, 3, 10, 1)], 0),
            Err(LedgerError::InvalidQuantity { quantity: 0, .. })
        ));
    }

    #[test]
    fn exact_cover_stops_at_zero_need() {
        let plan = plan_fifo(Uuid::nil(), &[batch(1, 5, 10, 2), batch(2, 5, 20, 1)], 5).unwrap();
        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.quantity, 5);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(100))]

        /// A successful plan takes exactly the requested units and never overdraws a batch
        #[test]
        fn prop_plan_covers_request_exactly(
            sizes in proptest::collection::vec((1i64..=20, 0i64..=50), 1..6),
            quantity in 1i64..=60,
        ) {
            let batches: Vec<Batch> = sizes
                .iter()
                .enumerate()
                .map(|(i, (qty, cost))| batch(i as i64 + 1, *qty, *cost, (10 - i) as i64))
                .collect();
            let available: i64 = sizes.iter().map(|(q, _)| q).sum();

            match plan_fifo(Uuid::nil(), &batches, quantity) {
                Ok(plan) => {
                    proptest::prop_assert!(quantity <= available);
                    proptest::prop_assert_eq!(plan.quantity, quantity);
                    proptest::prop_assert_eq!(plan.draws.iter().map(|d| d.quantity).sum::<i64>(), quantity);
                    for draw in &plan.draws {
                        proptest::prop_assert!(draw.remaining_after >= 0);
                        proptest::prop_assert!(draw.quantity > 0);
                    }
                }
                Err(LedgerError::InsufficientBatchStock { available: reported, .. }) => {
                    proptest::prop_assert!(quantity > available);
                    proptest::prop_assert_eq!(reported, available);
                }
                Err(other) => proptest::prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
