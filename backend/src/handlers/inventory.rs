//! HTTP handlers for stock ledger endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ledger::{BundleStock, VariantLedger};
use shared::models::{Batch, Variant};
use uuid::Uuid;
use validator::Validate;

use super::orders::validate_money;
use crate::error::AppResult;
use crate::middleware::{AdminUser, CurrentUser};
use crate::AppState;

/// Stock received from a supplier
#[derive(Debug, Deserialize, Validate)]
pub struct ReceiveStockInput {
    #[validate(range(min = 1, message = "Quantity received must be at least 1"))]
    pub quantity: i64,
    #[validate(custom = "validate_money")]
    pub unit_buying_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ReceiveStockResponse {
    pub success: bool,
    pub variant: Variant,
    pub batch: Batch,
}

/// Receive stock for a variant
pub async fn receive_stock(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(variant_id): Path<Uuid>,
    Json(input): Json<ReceiveStockInput>,
) -> AppResult<Json<ReceiveStockResponse>> {
    input.validate()?;

    let replenishment = state
        .ledger
        .receive_stock(variant_id, input.quantity, input.unit_buying_price)
        .await?;

    tracing::info!(
        %variant_id,
        batch_id = replenishment.batch.id,
        received_by = %admin.0.user_id,
        "stock received"
    );

    Ok(Json(ReceiveStockResponse {
        success: true,
        variant: replenishment.variant,
        batch: replenishment.batch,
    }))
}

/// Get a variant with its batch history
pub async fn get_variant_ledger(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(variant_id): Path<Uuid>,
) -> AppResult<Json<VariantLedger>> {
    let ledger = state.ledger.variant_ledger(variant_id).await?;
    Ok(Json(ledger))
}

/// Get the number of whole bundles currently in stock
pub async fn get_bundle_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<BundleStock>> {
    let stock = state.ledger.bundle_stock(product_id).await?;
    Ok(Json(stock))
}
