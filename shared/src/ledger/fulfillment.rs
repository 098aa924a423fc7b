//! Order fulfillment inside one session
//!
//! The order row is inserted first, then each line in request order: the line
//! item is created with a zero cost, its stock is consumed (through the bundle
//! components when the line sells a bundle), and the realized cost is written
//! back onto the line. Any error leaves the caller's session to be rolled back.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::bundle::{blend_bundle_cost, expand_bundle};
use super::consumption::reduce_stock;
use super::error::{LedgerError, LedgerResult};
use super::session::StockSession;
use super::stock;
use crate::models::{
    BundleComponent, BundleOf, LineItemRequest, NewOrder, NewOrderItem, Order, OrderItem,
    OrderRequest, OrderStatus, Product,
};
use crate::types::round_money;
use crate::validation::{
    validate_bundle_quantities, validate_display_name, validate_quantity, validate_sale_price,
};

/// An order whose stock has been consumed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FulfilledOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Variants whose stock was actually decremented, in consumption order
    #[serde(skip)]
    pub consumed_variants: Vec<Uuid>,
}

/// Reject a request before any row is written
pub fn validate_request(request: &OrderRequest) -> LedgerResult<()> {
    if request.items.is_empty() {
        return Err(LedgerError::EmptyOrder);
    }
    if request.total_amount < Decimal::ZERO {
        return Err(LedgerError::InvalidPrice(format!(
            "order total {} cannot be negative",
            request.total_amount
        )));
    }
    for line in &request.items {
        validate_quantity(line.quantity)
            .map_err(|msg| LedgerError::invalid_quantity(line.quantity, msg))?;
        validate_sale_price(line.unit_price, line.unit_discount)
            .map_err(|msg| LedgerError::InvalidPrice(msg.to_string()))?;
        validate_display_name(&line.name)
            .map_err(|msg| LedgerError::InvalidLineItem(msg.to_string()))?;
    }
    Ok(())
}

/// Create the order and consume stock for every line inside `session`
///
/// Does not commit.
pub async fn fulfill_in<S: StockSession>(
    session: &mut S,
    request: &OrderRequest,
) -> LedgerResult<FulfilledOrder> {
    validate_request(request)?;

    let order = session
        .insert_order(NewOrder {
            buyer_id: request.buyer_id,
            buyer_phone: request.buyer_phone.clone(),
            total_amount: request.total_amount,
            status: request.status,
            channel: request.channel,
        })
        .await?;

    let mut items = Vec::with_capacity(request.items.len());
    let mut consumed_variants = Vec::new();

    for line in &request.items {
        let item = fulfill_line(session, order.id, line, &mut consumed_variants).await?;
        items.push(item);
    }

    tracing::info!(
        order_id = %order.id,
        channel = order.channel.as_str(),
        lines = items.len(),
        "order stock consumed"
    );

    Ok(FulfilledOrder {
        order,
        items,
        consumed_variants,
    })
}

async fn fulfill_line<S: StockSession>(
    session: &mut S,
    order_id: Uuid,
    line: &LineItemRequest,
    consumed_variants: &mut Vec<Uuid>,
) -> LedgerResult<OrderItem> {
    let variant = session
        .load_variant(line.variant_id)
        .await?
        .ok_or(LedgerError::VariantNotFound(line.variant_id))?;
    let product = session.load_product(variant.product_id).await?;

    let mut item = session
        .insert_order_item(NewOrderItem {
            order_id,
            variant_id: line.variant_id,
            name: line.name.clone(),
            image: line.image.clone(),
            serial_number: line.serial_number.clone(),
            quantity: line.quantity,
            price: line.unit_price,
            unit_buying_price: Decimal::ZERO,
            unit_discount: line.unit_discount,
        })
        .await?;

    let unit_cost = match product.filter(|p| p.consumes_components()) {
        Some(bundle) => {
            let leaves = BundleOf::new(leaf_components(session, &bundle).await?);

            let mut consumed = Vec::new();
            for demand in expand_bundle(&leaves, line.quantity)? {
                let consumption = reduce_stock(session, demand.variant_id, demand.quantity).await?;
                consumed_variants.push(demand.variant_id);
                consumed.push((demand, consumption.average_unit_cost));
            }
            tracing::debug!(
                %order_id,
                bundle_id = %bundle.id,
                components = consumed.len(),
                "bundle line expanded"
            );
            blend_bundle_cost(&consumed, line.quantity)?
        }
        None => {
            let consumption = reduce_stock(session, line.variant_id, line.quantity).await?;
            consumed_variants.push(line.variant_id);
            consumption.average_unit_cost
        }
    };

    let unit_cost = round_money(unit_cost);
    session.set_item_unit_cost(item.id, unit_cost).await?;
    item.unit_buying_price = unit_cost;

    Ok(item)
}

/// Flatten a bundle into the plain variants one unit of it consumes
///
/// A component whose product is itself a bundle is replaced by that bundle's
/// components, with quantities multiplied down the tree. Components come back
/// in depth-first order and a variant reached twice is listed once. A bundle
/// that contains itself is rejected.
pub async fn leaf_components<S: StockSession>(
    session: &mut S,
    bundle: &Product,
) -> LedgerResult<Vec<BundleComponent>> {
    check_bundle(bundle)?;

    // (component, units per outer bundle, bundles enclosing it)
    let mut pending: Vec<(BundleComponent, i64, Vec<Uuid>)> = bundle
        .bundle_of
        .components()
        .iter()
        .rev()
        .map(|c| (*c, c.quantity, vec![bundle.id]))
        .collect();
    let mut leaves = Vec::new();

    while let Some((component, per_bundle, path)) = pending.pop() {
        let variant = session
            .load_variant(component.variant_id)
            .await?
            .ok_or(LedgerError::VariantNotFound(component.variant_id))?;
        let nested = session
            .load_product(variant.product_id)
            .await?
            .filter(|p| p.consumes_components());

        let Some(inner) = nested else {
            match leaves
                .iter_mut()
                .find(|leaf: &&mut BundleComponent| leaf.variant_id == component.variant_id)
            {
                Some(leaf) => {
                    leaf.quantity = leaf.quantity.checked_add(per_bundle).ok_or_else(|| {
                        LedgerError::invalid_quantity(per_bundle, "nested bundle quantity is too large")
                    })?;
                }
                None => leaves.push(BundleComponent {
                    variant_id: component.variant_id,
                    quantity: per_bundle,
                }),
            }
            continue;
        };

        if path.contains(&inner.id) {
            return Err(LedgerError::InvalidLineItem(format!(
                "bundle {} contains itself",
                inner.id
            )));
        }
        check_bundle(&inner)?;

        let mut inner_path = path;
        inner_path.push(inner.id);
        for c in inner.bundle_of.components().iter().rev() {
            let quantity = c.quantity.checked_mul(per_bundle).ok_or_else(|| {
                LedgerError::invalid_quantity(per_bundle, "nested bundle quantity is too large")
            })?;
            pending.push((*c, quantity, inner_path.clone()));
        }
    }

    Ok(leaves)
}

fn check_bundle(bundle: &Product) -> LedgerResult<()> {
    let quantities: Vec<i64> = bundle.bundle_of.components().iter().map(|c| c.quantity).collect();
    validate_bundle_quantities(&quantities)
        .map_err(|msg| LedgerError::InvalidLineItem(format!("bundle {}: {}", bundle.id, msg)))
}

/// Mark the order `backorder` if any consumed variant is now oversold
///
/// Returns whether the status was changed.
pub async fn flag_backorder<S: StockSession>(
    session: &mut S,
    fulfilled: &FulfilledOrder,
) -> LedgerResult<bool> {
    let mut variant_ids = fulfilled.consumed_variants.clone();
    variant_ids.sort();
    variant_ids.dedup();

    let oversold = stock::oversold_variants(session, &variant_ids).await?;
    if oversold.is_empty() {
        return Ok(false);
    }

    session
        .set_order_status(fulfilled.order.id, OrderStatus::Backorder)
        .await?;

    tracing::warn!(
        order_id = %fulfilled.order.id,
        oversold = oversold.len(),
        "order accepted against oversold stock"
    );

    Ok(true)
}
