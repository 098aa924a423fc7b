//! Stock replenishment
//!
//! Receiving stock appends a batch and refreshes the variant's blended
//! `buying_price`. That blended figure is a valuation view over the lifetime
//! of the variant; sales are costed from the batches instead, so the two are
//! expected to diverge once stock has been partially sold.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::batches;
use super::error::{LedgerError, LedgerResult};
use super::session::StockSession;
use super::stock;
use crate::models::{Batch, Variant};
use crate::types::round_money;
use crate::validation::{validate_quantity, validate_unit_cost};

/// Outcome of receiving stock for a variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Replenishment {
    pub variant: Variant,
    pub batch: Batch,
}

/// Blend the current average cost with a newly received quantity
///
/// `(stock * current + received * unit_cost) / (stock + received)`, or zero
/// when the combined quantity is not positive.
pub fn blended_average(stock: i64, current: Decimal, received: i64, unit_cost: Decimal) -> Decimal {
    let total = stock + received;
    if total <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(stock) * current + Decimal::from(received) * unit_cost) / Decimal::from(total)
}

/// Receive `quantity` units at `unit_cost` inside the caller's session
pub async fn receive_stock<S: StockSession>(
    session: &mut S,
    variant_id: Uuid,
    quantity: i64,
    unit_cost: Decimal,
) -> LedgerResult<Replenishment> {
    validate_quantity(quantity).map_err(|msg| LedgerError::invalid_quantity(quantity, msg))?;
    validate_unit_cost(unit_cost).map_err(|msg| LedgerError::InvalidPrice(msg.to_string()))?;

    let variant = session
        .lock_variant(variant_id)
        .await?
        .ok_or(LedgerError::VariantNotFound(variant_id))?;

    let new_average = round_money(blended_average(
        variant.stock,
        variant.buying_price,
        quantity,
        unit_cost,
    ));

    let stock_after = stock::adjust_stock(session, variant_id, quantity).await?;
    session.set_buying_price(variant_id, new_average).await?;
    let batch = batches::append_batch(session, variant_id, quantity, unit_cost).await?;

    let variant = session
        .load_variant(variant_id)
        .await?
        .ok_or(LedgerError::VariantNotFound(variant_id))?;

    tracing::info!(
        %variant_id,
        quantity,
        %unit_cost,
        stock_after,
        buying_price = %new_average,
        "stock received"
    );

    Ok(Replenishment { variant, batch })
}
