//! Batch ledger: append-only receipt history per variant
//!
//! No business validation happens here; callers validate before appending.

use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerResult;
use super::session::StockSession;
use crate::models::{Batch, NewBatch};

/// Append a receipt batch whose full quantity is still on hand
pub async fn append_batch<S: StockSession>(
    session: &mut S,
    variant_id: Uuid,
    quantity: i64,
    unit_cost: Decimal,
) -> LedgerResult<Batch> {
    let batch = session
        .insert_batch(NewBatch {
            variant_id,
            quantity_received: quantity,
            buying_price: unit_cost,
        })
        .await?;

    tracing::debug!(
        batch_id = batch.id,
        %variant_id,
        quantity,
        %unit_cost,
        "batch appended"
    );

    Ok(batch)
}

/// Batches that still hold stock, oldest received first, locked for update
pub async fn open_batches<S: StockSession>(
    session: &mut S,
    variant_id: Uuid,
) -> LedgerResult<Vec<Batch>> {
    session.lock_open_batches(variant_id).await
}

/// Persist a batch's new remaining quantity
pub async fn update_remaining<S: StockSession>(
    session: &mut S,
    batch_id: i64,
    remaining: i64,
) -> LedgerResult<()> {
    session.set_batch_remaining(batch_id, remaining).await
}
