//! Stock accessor: the signed running stock counter per variant
//!
//! The counter has no floor. A negative value is the number of units sold
//! ahead of replenishment (backorder).

use uuid::Uuid;

use super::error::LedgerResult;
use super::session::StockSession;

/// Add a signed delta to a variant's stock and return the new value
pub async fn adjust_stock<S: StockSession>(
    session: &mut S,
    variant_id: Uuid,
    delta: i64,
) -> LedgerResult<i64> {
    let stock = session.add_stock(variant_id, delta).await?;
    if stock < 0 {
        tracing::debug!(%variant_id, stock, "variant is backordered");
    }
    Ok(stock)
}

/// Variants among `variant_ids` whose stock is below zero
pub async fn oversold_variants<S: StockSession>(
    session: &mut S,
    variant_ids: &[Uuid],
) -> LedgerResult<Vec<(Uuid, i64)>> {
    Ok(session
        .stock_levels(variant_ids)
        .await?
        .into_iter()
        .filter(|(_, stock)| *stock < 0)
        .collect())
}
